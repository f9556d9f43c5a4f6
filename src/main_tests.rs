// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - CLI parsing and signal handler setup

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use crate::Cli;

    // ========================================================================
    // CLI Parsing Tests
    // ========================================================================

    #[test]
    fn test_cli_declaration_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["meshdns"]).expect("bare invocation parses");

        assert_eq!(cli.mesh_namespace, "traefik-mesh");
        assert_eq!(cli.dns_service, "traefik-mesh-dns");
        assert_eq!(cli.dns_port, 53);
        assert!(!cli.no_restore, "Restore must be on by default");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "meshdns",
            "--mesh-namespace",
            "mesh-system",
            "--dns-service",
            "mesh-dns",
            "--dns-port",
            "1053",
            "--no-restore",
        ])
        .expect("explicit flags parse");

        assert_eq!(cli.mesh_namespace, "mesh-system");
        assert_eq!(cli.dns_service, "mesh-dns");
        assert_eq!(cli.dns_port, 1053);
        assert!(cli.no_restore);
    }

    #[test]
    fn test_cli_rejects_non_numeric_port() {
        let result = Cli::try_parse_from(["meshdns", "--dns-port", "banana"]);
        assert!(result.is_err(), "Expected a parse error for the port");
    }

    // ========================================================================
    // Signal Handling Tests
    // ========================================================================

    /// The shutdown path hinges on registering both handlers; actual
    /// signal delivery is covered manually.
    #[tokio::test]
    async fn test_signal_handler_creation() {
        use tokio::signal::unix::{signal, SignalKind};

        assert!(
            signal(SignalKind::interrupt()).is_ok(),
            "Should be able to create a SIGINT handler"
        );
        assert!(
            signal(SignalKind::terminate()).is_ok(),
            "Should be able to create a SIGTERM handler"
        );
    }
}

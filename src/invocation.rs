//! Docker argument lists for every tool invocation.
//!
//! All builders are pure: they take an already validated [`WorkflowConfig`]
//! and the tool [`Settings`] and return the argv handed to the docker CLI
//! (without the `docker` program name itself).
//!
//! # Scan
//!
//! ```text
//! run --name=<scan_container>
//!     -v /var/run/docker.sock:/var/run/docker.sock
//!     -v <cache_volume>:/root/.cache
//!     -v <report_volume>:/output
//!     <scanner_image> image --vuln-type os --ignore-unfixed
//!     --timeout <timeout> --format json --output /output/<report>
//!     <image_reference>
//! ```
//!
//! # Patch
//!
//! The patch tool reads its trailing six arguments positionally, so their
//! order and count never change:
//!
//! ```text
//! run --rm --name=<patch_container>
//!     --mount type=bind,source=/var/run/docker.sock,target=/var/run/docker.sock
//!     --mount type=volume,source=<report_volume>,target=/data
//!     <patch_image> <image_reference> <tag> <timeout> <backend> openvex <report>
//! ```

use crate::config::Settings;
use crate::workflow::WorkflowConfig;

/// Host docker socket shared with the tool containers.
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Mount point of the report volume inside the scanner container.
const SCAN_OUTPUT_DIR: &str = "/output";

/// Mount point of the report volume inside the patch and reader containers.
const PATCH_DATA_DIR: &str = "/data";

/// Output format requested from the patch tool.
const PATCH_OUTPUT_FORMAT: &str = "openvex";

/// Marker the docker daemon reports when the containerd image store is active.
pub const CONTAINERD_SNAPSHOTTER_MARKER: &str = "io.containerd.snapshotter.v1";

/// Number of arguments in every patch command.
pub const PATCH_COMMAND_LEN: usize = 14;

fn effective_timeout<'a>(config: &'a WorkflowConfig, settings: &'a Settings) -> &'a str {
    if config.timeout.is_empty() {
        &settings.default_timeout
    } else {
        &config.timeout
    }
}

fn effective_report<'a>(config: &'a WorkflowConfig, settings: &'a Settings) -> &'a str {
    if config.report_file_name.is_empty() {
        &settings.report_file_name
    } else {
        &config.report_file_name
    }
}

/// Build the scan stage invocation.
pub fn build_scan_command(config: &WorkflowConfig, settings: &Settings) -> Vec<String> {
    vec![
        "run".to_string(),
        format!("--name={}", settings.scan_container),
        "-v".to_string(),
        format!("{}:{}", DOCKER_SOCKET, DOCKER_SOCKET),
        "-v".to_string(),
        format!("{}:/root/.cache", settings.cache_volume),
        "-v".to_string(),
        format!("{}:{}", settings.report_volume, SCAN_OUTPUT_DIR),
        settings.scanner_image.clone(),
        "image".to_string(),
        "--vuln-type".to_string(),
        "os".to_string(),
        "--ignore-unfixed".to_string(),
        "--timeout".to_string(),
        effective_timeout(config, settings).to_string(),
        "--format".to_string(),
        "json".to_string(),
        "--output".to_string(),
        format!("{}/{}", SCAN_OUTPUT_DIR, effective_report(config, settings)),
        config.image_reference.clone(),
    ]
}

/// Build the patch stage invocation.
///
/// `derived_tag` is normally [`WorkflowConfig::derived_tag`]; it is a
/// parameter so callers compute it exactly once per run.
pub fn build_patch_command(
    config: &WorkflowConfig,
    derived_tag: &str,
    settings: &Settings,
) -> Vec<String> {
    vec![
        "run".to_string(),
        "--rm".to_string(),
        format!("--name={}", settings.patch_container),
        "--mount".to_string(),
        format!("type=bind,source={},target={}", DOCKER_SOCKET, DOCKER_SOCKET),
        "--mount".to_string(),
        format!(
            "type=volume,source={},target={}",
            settings.report_volume, PATCH_DATA_DIR
        ),
        settings.patch_image.clone(),
        config.image_reference.clone(),
        derived_tag.to_string(),
        effective_timeout(config, settings).to_string(),
        config.patch_backend.flag().to_string(),
        PATCH_OUTPUT_FORMAT.to_string(),
        effective_report(config, settings).to_string(),
    ]
}

/// Build the read-only invocation that prints the scan report to stdout.
pub fn build_report_command(report_file_name: &str, settings: &Settings) -> Vec<String> {
    vec![
        "run".to_string(),
        "--rm".to_string(),
        "-v".to_string(),
        format!("{}:{}", settings.report_volume, PATCH_DATA_DIR),
        settings.reader_image.clone(),
        "cat".to_string(),
        format!("{}/{}", PATCH_DATA_DIR, report_file_name),
    ]
}

/// Build the invocations that remove leftovers of a previous run.
///
/// Containers go first because a volume in use cannot be removed. The
/// scanner cache volume is kept.
pub fn build_cleanup_commands(settings: &Settings) -> Vec<Vec<String>> {
    vec![
        vec![
            "container".to_string(),
            "rm".to_string(),
            "--force".to_string(),
            settings.scan_container.clone(),
        ],
        vec![
            "container".to_string(),
            "rm".to_string(),
            "--force".to_string(),
            settings.patch_container.clone(),
        ],
        vec![
            "volume".to_string(),
            "rm".to_string(),
            "--force".to_string(),
            settings.report_volume.clone(),
        ],
    ]
}

/// Build the daemon introspection query used for backend detection.
pub fn build_probe_command() -> Vec<String> {
    vec![
        "info".to_string(),
        "--format".to_string(),
        "{{json .DriverStatus}}".to_string(),
    ]
}

/// Build the query listing locally known image references.
pub fn build_list_images_command() -> Vec<String> {
    vec![
        "images".to_string(),
        "--format".to_string(),
        "{{.Repository}}:{{.Tag}}".to_string(),
    ]
}

/// Render an argv as a copy-pasteable shell command line for logs.
pub fn display_command(program: &str, argv: &[String]) -> String {
    let mut words = Vec::with_capacity(argv.len() + 1);
    words.push(program);
    words.extend(argv.iter().map(String::as_str));
    shell_words::join(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::PatchBackend;

    fn config(image: &str) -> WorkflowConfig {
        WorkflowConfig::new(image, "scan.json")
    }

    #[test]
    fn test_scan_command_order() {
        let settings = Settings::default();
        let argv = build_scan_command(&config("nginx:1.21.6"), &settings);

        assert_eq!(argv[0], "run");
        assert_eq!(argv[1], "--name=copatch-scan");
        assert_eq!(argv[7], "copatch-reports:/output");
        assert_eq!(argv[8], "aquasec/trivy:latest");
        assert_eq!(argv[9], "image");
        assert_eq!(argv[14], "5m");
        assert_eq!(argv[18], "/output/scan.json");
        assert_eq!(argv.last().unwrap(), "nginx:1.21.6");
    }

    #[test]
    fn test_scan_command_uses_explicit_timeout() {
        let settings = Settings::default();
        let argv = build_scan_command(&config("nginx").with_timeout("90s"), &settings);
        let pos = argv.iter().position(|a| a == "--timeout").unwrap();
        assert_eq!(argv[pos + 1], "90s");
    }

    #[test]
    fn test_patch_command_positional_tail() {
        let settings = Settings::default();
        let cfg = config("nginx:1.21.6");
        let argv = build_patch_command(&cfg, &cfg.derived_tag(), &settings);

        assert_eq!(argv.len(), PATCH_COMMAND_LEN);
        assert_eq!(
            &argv[7..],
            &[
                "ghcr.io/project-copacetic/copacetic:latest",
                "nginx:1.21.6",
                "1.21.6-patched",
                "5m",
                "buildx",
                "openvex",
                "scan.json",
            ]
        );
    }

    #[test]
    fn test_patch_command_shape_invariant_for_empty_optionals() {
        let settings = Settings::default();
        let configs = [
            config("nginx"),
            config("nginx:1.21.6").with_tag("custom").with_timeout("10m"),
            WorkflowConfig::new("nginx", ""),
            config("nginx").with_backend(PatchBackend::AlternateSocket),
        ];

        for cfg in &configs {
            let argv = build_patch_command(cfg, &cfg.derived_tag(), &settings);
            assert_eq!(argv.len(), PATCH_COMMAND_LEN, "{:?}", cfg);
            assert!(argv.iter().all(|a| !a.is_empty()), "{:?}", argv);
            assert_eq!(argv[11], cfg.patch_backend.flag());
            assert_eq!(argv[12], "openvex");
        }
    }

    #[test]
    fn test_patch_command_alternate_backend() {
        let settings = Settings::default();
        let cfg = config("nginx").with_backend(PatchBackend::AlternateSocket);
        let argv = build_patch_command(&cfg, &cfg.derived_tag(), &settings);
        assert_eq!(argv[11], "custom-socket");
        assert_eq!(argv[9], "latest-patched");
    }

    #[test]
    fn test_report_command_reads_from_shared_volume() {
        let settings = Settings::default();
        let argv = build_report_command("scan.json", &settings);
        assert_eq!(argv[3], "copatch-reports:/data");
        assert_eq!(argv[4], "busybox:latest");
        assert_eq!(&argv[5..], &["cat", "/data/scan.json"]);
    }

    #[test]
    fn test_cleanup_removes_containers_before_volume() {
        let settings = Settings::default();
        let commands = build_cleanup_commands(&settings);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0][0], "container");
        assert_eq!(commands[1][0], "container");
        assert_eq!(commands[2][0], "volume");
        assert_eq!(commands[2][3], "copatch-reports");
        assert!(!commands.iter().flatten().any(|a| a == "copatch-trivy-cache"));
    }

    #[test]
    fn test_display_command_quotes_templates() {
        let rendered = display_command("docker", &build_probe_command());
        assert_eq!(rendered, "docker info --format '{{json .DriverStatus}}'");
    }
}

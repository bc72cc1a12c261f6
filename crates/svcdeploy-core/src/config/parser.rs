//! TOML parser with helpful error messages

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use super::schema::{ServiceEntry, ServicesFile};
use super::{DeployConfig, Timings, WrapperConfig};
use crate::types::{ServiceDefinition, is_strict_descendant, normalize};

/// Parse services.toml; relative sources resolve against the file's directory.
pub fn load_config(path: &Path) -> Result<DeployConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let bundle_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    parse_config_str(&content, &bundle_dir)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse services.toml content from string
pub fn parse_config_str(content: &str, bundle_dir: &Path) -> Result<DeployConfig> {
    let file: ServicesFile =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;
    resolve(file, bundle_dir)
}

fn resolve(file: ServicesFile, bundle_dir: &Path) -> Result<DeployConfig> {
    if !file.base_dir.is_absolute() {
        anyhow::bail!(
            "base_dir must be an absolute path, got {}",
            file.base_dir.display()
        );
    }
    let base_dir = normalize(&file.base_dir);

    let wrapper = WrapperConfig {
        source: bundle_dir.join(&file.wrapper.source),
        subdir: file.wrapper.subdir,
    };
    let timings = Timings {
        copy_retry_backoff: Duration::from_millis(file.timings.copy_retry_backoff_ms),
        settle_delay: Duration::from_millis(file.timings.settle_delay_ms),
    };

    let services = file
        .services
        .iter()
        .map(|entry| resolve_service(entry, bundle_dir, &base_dir))
        .collect::<Result<Vec<_>>>()?;

    DeployConfig::new(base_dir, wrapper, timings, services)
}

fn resolve_service(
    entry: &ServiceEntry,
    bundle_dir: &Path,
    base_dir: &Path,
) -> Result<ServiceDefinition> {
    let destination = normalize(&base_dir.join(&entry.destination));
    let executable = normalize(&destination.join(&entry.executable));

    ServiceDefinition::new(
        entry.name.clone(),
        bundle_dir.join(&entry.source),
        destination,
        executable,
    )
    .with_context(|| format!("Invalid [[service]] entry '{}'", entry.name))
}

/// Check the cross-definition invariants of a service set.
pub(crate) fn validate_services(base_dir: &Path, services: &[ServiceDefinition]) -> Result<()> {
    if services.is_empty() {
        anyhow::bail!("No [[service]] entries defined");
    }

    // The reference service registry compares names case-insensitively.
    let mut names = HashSet::new();
    for (i, def) in services.iter().enumerate() {
        if !names.insert(def.name().to_lowercase()) {
            anyhow::bail!("Duplicate service name: {}", def.name());
        }
        if !is_strict_descendant(def.destination(), base_dir) {
            anyhow::bail!(
                "Destination {} of service '{}' is not inside base_dir {}",
                def.destination().display(),
                def.name(),
                base_dir.display()
            );
        }
        // Staging deletes the destination first, so no destination may sit
        // inside another.
        if let Some(other) = services[..i]
            .iter()
            .find(|other| overlaps(def.destination(), other.destination()))
        {
            anyhow::bail!(
                "Destination {} of service '{}' overlaps destination {} of service '{}'",
                def.destination().display(),
                def.name(),
                other.destination().display(),
                other.name()
            );
        }
    }
    Ok(())
}

/// Check that the wrapper subdirectory is a private directory under `base_dir`.
pub(crate) fn validate_wrapper(
    base_dir: &Path,
    wrapper: &WrapperConfig,
    services: &[ServiceDefinition],
) -> Result<()> {
    let relative = wrapper
        .subdir
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir | Component::ParentDir));
    if !relative {
        anyhow::bail!(
            "wrapper.subdir must be a relative path, got {}",
            wrapper.subdir.display()
        );
    }

    let wrapper_dir = normalize(&base_dir.join(&wrapper.subdir));
    if !is_strict_descendant(&wrapper_dir, base_dir) {
        anyhow::bail!(
            "wrapper.subdir {} is not inside base_dir {}",
            wrapper.subdir.display(),
            base_dir.display()
        );
    }

    if let Some(def) = services
        .iter()
        .find(|def| overlaps(def.destination(), &wrapper_dir))
    {
        anyhow::bail!(
            "Destination {} of service '{}' overlaps the wrapper directory {}",
            def.destination().display(),
            def.name(),
            wrapper_dir.display()
        );
    }
    Ok(())
}

/// Equal paths, or one inside the other.
fn overlaps(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b) || is_strict_descendant(a, b) || is_strict_descendant(b, a)
}

/// Enhance TOML parsing errors with helpful context
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.message().to_string();

    let line_hint = error.span().and_then(|span| {
        content
            .get(..span.start)
            .map(|before| before.matches('\n').count() + 1)
    });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

use std::path::{Path, PathBuf};

use log::debug;

use crate::auth::AuthenticationService;
use crate::command::{Command, SvnCommandName, Target};
use crate::config::SvnConfig;
use crate::execution::BatchExecutor;
use crate::parse::parse_info_xml;

const ADMIN_DIR: &str = ".svn";

/// Nearest ancestor of `path` (inclusive) holding an administrative directory.
pub fn working_copy_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|dir| dir.join(ADMIN_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Directory relative targets are interpreted against.
fn base_directory(command: &Command, config: &SvnConfig) -> Option<PathBuf> {
    command
        .get_working_directory()
        .or(config.default_working_directory.as_deref())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
}

/// Absolute form of the first local target.
pub(crate) fn first_local_path(command: &Command, config: &SvnConfig) -> Option<PathBuf> {
    let path = command.first_path_target()?;
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    base_directory(command, config).map(|base| base.join(path))
}

/// Fill in working directory, repository URL and config directory.
pub(crate) async fn prepare(command: &mut Command, config: &SvnConfig, auth: &dyn AuthenticationService) {
    if command.get_working_directory().is_none() {
        let absolute_targets = command
            .get_targets()
            .iter()
            .filter_map(Target::as_path)
            .all(Path::is_absolute);
        let root = command
            .first_path_target()
            .filter(|_| absolute_targets)
            .and_then(working_copy_root);
        if let Some(dir) = root.or_else(|| config.default_working_directory.clone()) {
            command.set_working_directory(dir);
        }
    }

    if auth.have_data_for_tmp_config()
        && let Some(dir) = auth.special_config_dir()
    {
        command.set_config_directory(dir);
    } else if command.get_config_directory().is_none()
        && let Some(dir) = &config.config_directory
    {
        command.set_config_directory(dir.clone());
    }

    if command.get_repository_url().is_none()
        && let Some(url) = resolve_repository_url(command, config).await
    {
        debug!("Resolved repository URL {url} for {}", command.name());
        command.set_repository_url(url);
    }
}

async fn resolve_repository_url(command: &Command, config: &SvnConfig) -> Option<String> {
    if let Some(url) = command.first_url_target() {
        return Some(url.to_string());
    }
    let path = first_local_path(command, config)?;
    if let Some(url) = config.mapped_url(&path) {
        return Some(url);
    }
    let skip_probe = command.is_local()
        || matches!(
            command.name(),
            SvnCommandName::Info | SvnCommandName::Version | SvnCommandName::Cleanup
        );
    if skip_probe {
        return None;
    }
    probe_url(command, config, &path).await
}

/// Best-effort `info --xml` on the working copy; any failure yields `None`.
async fn probe_url(command: &Command, config: &SvnConfig, path: &Path) -> Option<String> {
    let root = working_copy_root(path)?;
    let mut probe = Command::new(SvnCommandName::Info)
        .parameter("--xml")
        .target(Target::path(&root))
        .working_directory(&root);
    if let Some(dir) = command.get_config_directory() {
        probe.set_config_directory(dir.to_path_buf());
    }
    probe.force_non_interactive();

    let mut executor = BatchExecutor::new(&probe, config).ok()?;
    let result = executor.run().await;
    executor.cleanup();
    let result = result.ok().filter(|r| r.is_success())?;

    let mut url = None;
    if let Err(e) = parse_info_xml(&result.stdout, &root, |info| {
        url = url.take().or(info.url);
    }) {
        debug!("Repository URL probe for {} failed: {e}", root.display());
        return None;
    }
    url
}

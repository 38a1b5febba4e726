//! Process argument assembly.

use std::path::{Path, PathBuf};

use kodegen_tools_svn::{Command, CommandLine, Credentials, SvnCommandName, SvnConfig, Target};

#[test]
fn test_working_and_config_directory_survive_assembly() {
    let command = Command::new(SvnCommandName::Status)
        .parameter("--xml")
        .target(Target::path("src"))
        .working_directory("/work/copy")
        .config_directory("/home/me/.subversion-ide");

    let line = CommandLine::build(&command, &SvnConfig::default(), false).unwrap();

    assert_eq!(line.working_directory(), Path::new("/work/copy"));
    assert_eq!(
        line.config_directory(),
        Some(PathBuf::from("/home/me/.subversion-ide"))
    );
    assert_eq!(&line.args()[2], "status");
}

#[test]
fn test_no_config_dir_flag_without_directory() {
    let command = Command::new(SvnCommandName::Info).working_directory("/wc");
    let line = CommandLine::build(&command, &SvnConfig::default(), false).unwrap();
    assert_eq!(line.config_directory(), None);
    assert_eq!(line.args(), &["info", "--non-interactive"]);
}

#[test]
fn test_locale_is_forced() {
    let command = Command::new(SvnCommandName::Info).working_directory("/wc");
    let line = CommandLine::build(&command, &SvnConfig::default(), false).unwrap();
    for key in ["LC_ALL", "LANG", "LC_MESSAGES"] {
        assert!(
            line.env().iter().any(|(k, v)| k == key && v == "C"),
            "{key} not forced"
        );
    }
}

#[test]
fn test_stored_credentials_skip_no_auth_cache() {
    let mut command = Command::new(SvnCommandName::Update).working_directory("/wc");
    command.set_credentials(Credentials::new("alice", "s3cret"));
    let config = SvnConfig::default().with_store_credentials(true);

    let line = CommandLine::build(&command, &config, false).unwrap();

    assert!(!line.args().iter().any(|a| a == "--no-auth-cache"));
    assert!(line.args().iter().any(|a| a == "s3cret"));
    assert!(!line.to_string().contains("s3cret"));
    assert!(!format!("{line:?}").contains("s3cret"));
}

#[test]
fn test_command_display_masks_credentials() {
    let mut command = Command::new(SvnCommandName::Commit).target(Target::path("a.txt"));
    command.set_credentials(Credentials::new("alice", "s3cret"));
    let shown = command.to_string();
    assert!(shown.starts_with("svn commit"));
    assert!(shown.contains("--username alice --password ******"));
    assert!(!shown.contains("s3cret"));
}

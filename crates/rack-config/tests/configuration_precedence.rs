//! Layering checks for the Rack configuration loader.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use rack_config::{Config, DEFAULT_HOST, LogFormat};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let previous = std::env::var_os(key);
        // Callers hold ENV_MUTEX for the lifetime of the override.
        unsafe { std::env::set_var(key, value) };
        Self { key, previous }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}

struct Harness {
    temp_dir: TempDir,
    args: Vec<OsString>,
    _guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn write_config(&mut self, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join("rack.toml");
        fs::write(&path, contents).expect("write configuration");
        self.args.push(OsString::from("--config-path"));
        self.args.push(path.clone().into_os_string());
        path
    }

    fn push(&mut self, arg: &str) {
        self.args.push(OsString::from(arg));
    }

    fn load(&self) -> Config {
        Config::load_from_iter(self.args.clone()).expect("configuration should load")
    }
}

#[fixture]
fn harness() -> Harness {
    let guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Harness {
        temp_dir: TempDir::new().expect("create temp dir"),
        args: vec![OsString::from("rack")],
        _guard: guard,
    }
}

#[rstest]
fn defaults_apply_without_overrides(harness: Harness) {
    let config = harness.load();
    assert_eq!(config.host(), DEFAULT_HOST);
    assert_eq!(config.log_format(), LogFormat::Compact);
}

#[rstest]
fn file_overrides_defaults(mut harness: Harness) {
    harness.write_config("host = \"https://file.example.com\"\nlog_format = \"json\"\n");
    let config = harness.load();
    assert_eq!(config.host(), "https://file.example.com");
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
fn environment_overrides_file(mut harness: Harness) {
    harness.write_config("host = \"https://file.example.com\"\n");
    let _env = EnvOverride::set_var("RACK_HOST", OsStr::new("https://env.example.com"));
    let config = harness.load();
    assert_eq!(config.host(), "https://env.example.com");
}

#[rstest]
fn cli_overrides_environment(mut harness: Harness) {
    let _env = EnvOverride::set_var("RACK_HOST", OsStr::new("https://env.example.com"));
    harness.push("--host");
    harness.push("https://cli.example.com");
    let config = harness.load();
    assert_eq!(config.host(), "https://cli.example.com");
}

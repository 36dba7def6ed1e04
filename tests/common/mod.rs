use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub engine_root: PathBuf,
    pub work: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).expect("create isolated home");

        let engine_root = tmp.path().join("engine");
        for version in ["1.29.0", "1.33.1"] {
            fs::create_dir_all(engine_root.join(version).join("packages"))
                .expect("seed engine version");
        }

        let config_dir = home.join(".config/steward");
        fs::create_dir_all(&config_dir).expect("create config dir");
        fs::write(
            config_dir.join("config.toml"),
            format!(
                "version = 1\n\n[engine]\nroot = \"{}\"\n",
                engine_root.display()
            ),
        )
        .expect("write config");

        let work = tmp.path().join("work");
        fs::create_dir_all(&work).expect("create work dir");

        Self {
            _tmp: tmp,
            home,
            engine_root,
            work,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("steward").expect("steward binary");
        cmd.env("HOME", &self.home)
            .env_remove("STEWARD_TOKEN")
            .current_dir(&self.work);
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let mut cmd = self.cmd();
        let out = cmd
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn run_json_failure(&self, args: &[&str]) -> Value {
        let mut cmd = self.cmd();
        let out = cmd
            .arg("--json")
            .args(args)
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json error output")
    }

    /// Pretend the engine extracted a package into its per-version cache.
    pub fn seed_cache(&self, engine_version: &str, cache_key: &str) -> PathBuf {
        let tree = self
            .engine_root
            .join(engine_version)
            .join("packages")
            .join(cache_key)
            .join("Modules");
        fs::create_dir_all(&tree).expect("seed cached extraction");
        fs::write(tree.join("audit.mof"), "cached").expect("seed cached file");
        tree.parent().expect("cache dir").to_path_buf()
    }

    /// Point the config at a scripted engine binary.
    pub fn set_engine_binary(&self, binary: &std::path::Path) {
        fs::write(
            self.home.join(".config/steward/config.toml"),
            format!(
                "version = 1\n\n[engine]\nroot = \"{}\"\nbinary = \"{}\"\n",
                self.engine_root.display(),
                binary.display()
            ),
        )
        .expect("rewrite config");
    }
}

use super::{apply_env, apply_file_config, load_seed, Settings};

use std::{
    collections::HashMap,
    env, fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_dir(name: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("truck_feed_{name}_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    dir
}

#[test]
fn file_config_overrides_defaults() {
    let mut settings = Settings::default();
    apply_file_config(
        &mut settings,
        "bind_addr = \"0.0.0.0:9000\"\nseed_file = \"fleet.json\"\nunrelated = 3\n",
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.seed_file, Some(PathBuf::from("fleet.json")));
}

#[test]
fn malformed_file_config_is_ignored() {
    let mut settings = Settings::default();
    apply_file_config(&mut settings, "bind_addr = ");
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_prefixed_env_wins_over_plain_env() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("SERVER_BIND", "127.0.0.1:1111"),
        ("APP__BIND_ADDR", "127.0.0.1:2222"),
        ("APP__SEED_FILE", "/srv/trucks.json"),
    ]);
    let mut settings = Settings::default();
    apply_env(&mut settings, |key| env.get(key).map(|v| v.to_string()));
    assert_eq!(settings.server_bind, "127.0.0.1:2222");
    assert_eq!(settings.seed_file, Some(PathBuf::from("/srv/trucks.json")));
}

#[test]
fn loads_seed_trucks_in_file_order() {
    let dir = temp_dir("seed");
    let path = dir.join("fleet.json");
    fs::write(&path, r#"[{"id":"T2","city":"Gniezno"},{"id":"T1"}]"#).expect("write");

    let trucks = load_seed(&path).expect("seed");
    let ids: Vec<&str> = trucks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["T2", "T1"]);

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn rejects_seed_that_is_not_a_truck_list() {
    let dir = temp_dir("bad_seed");
    let path = dir.join("fleet.json");
    fs::write(&path, r#"{"trucks":[]}"#).expect("write");

    let err = load_seed(&path).expect_err("should fail");
    assert!(err.to_string().contains("is not a truck list"));

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn missing_seed_file_is_an_error() {
    let dir = temp_dir("missing_seed");
    assert!(load_seed(&dir.join("absent.json")).is_err());
    fs::remove_dir_all(dir).expect("cleanup");
}

use fence_cli::clients::create_github_client_from_config;
use fence_core::{PresetName, get_config_dirs};
use fence_test_utils::EnvTestGuard;

// Environment variables are process-wide, so everything that mutates them
// lives in this single test.
#[test]
fn config_file_and_environment_feed_the_client() {
  let guard = EnvTestGuard::new();

  let dirs = get_config_dirs().unwrap();
  assert_eq!(dirs.config_path(), guard.config_file());

  let config = dirs.load_config().unwrap();
  assert_eq!(config.defaults.preset, PresetName::Recommended);
  assert_eq!(config.github.api_url, "https://api.github.com");

  std::fs::create_dir_all(guard.config_file().parent().unwrap()).unwrap();
  std::fs::write(
    guard.config_file(),
    "[github]\napi_url = \"https://ghe.example.com/api/v3\"\ntimeout_secs = 7\n\n[defaults]\npreset = \"strict\"\n",
  )
  .unwrap();

  let config = dirs.load_config().unwrap();
  assert_eq!(config.defaults.preset, PresetName::Strict);
  assert_eq!(config.github.api_url, "https://ghe.example.com/api/v3");

  let err = create_github_client_from_config(&config).unwrap_err();
  assert!(err.to_string().contains("No GitHub token found"));

  guard.set("FENCE_API_URL", "http://127.0.0.1:9");
  guard.set("GH_TOKEN", "test_token");

  let config = dirs.load_config().unwrap();
  assert_eq!(config.github.api_url, "http://127.0.0.1:9");

  let client = create_github_client_from_config(&config).unwrap();
  assert_eq!(client.base_url(), "http://127.0.0.1:9");
  assert_eq!(client.timeout().as_secs(), 7);
}

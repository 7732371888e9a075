use std::collections::HashMap;
use std::time::Duration;
use yaml_loadr::{env, BoxError, Error, FromNode, FromText, Loader, Node, ProcessEnv, Setting};

#[derive(Debug, PartialEq, Setting)]
#[config(from_text)]
enum Level {
    Low,
    High,
}

impl FromText for Level {
    fn from_text(text: &str) -> Result<Self, BoxError> {
        match text {
            "low" => Ok(Level::Low),
            "high" => Ok(Level::High),
            other => Err(format!("unknown level {:?}", other).into()),
        }
    }
}

#[derive(Debug, PartialEq, Setting)]
struct Database {
    #[field(yaml = "host", env = "TEST_DB_HOST")]
    pub host: String,
    #[field(yaml = "port", env = "TEST_DB_PORT")]
    pub port: u16,
}

#[derive(Debug, Setting)]
struct Config {
    #[field(yaml = "name", env = "TEST_NAME")]
    pub name: String,
    #[field(yaml = "port", env = "TEST_PORT")]
    pub port: u16,
    #[field(yaml = "debug", env = "TEST_DEBUG")]
    pub debug: bool,
    #[field(yaml = "limit", env = "TEST_LIMIT")]
    pub limit: Option<u32>,
    #[field(yaml = "timeout", env = "TEST_TIMEOUT")]
    pub timeout: Duration,
    #[field(yaml = "level", env = "TEST_LEVEL")]
    pub level: Option<Level>,
    #[field(yaml = "database")]
    pub database: Database,
    #[field(yaml = "replica")]
    pub replica: Option<Database>,
}

const DOCUMENT: &str = "\
name: doc-name
port: 8080
debug: false
limit: 5
timeout: 30s
level: low
database:
  host: localhost
  port: 5432
replica: null
";

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn load_with(pairs: &[(&str, &str)], source: &str) -> Result<Config, Error> {
    Loader::new().with_env(vars(pairs)).load(source)
}

#[test]
fn test_unset_variables_keep_document_values() {
    let config = load_with(&[], DOCUMENT).unwrap();

    assert_eq!(config.name, "doc-name");
    assert_eq!(config.port, 8080);
    assert!(!config.debug);
    assert_eq!(config.limit, Some(5));
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.level, Some(Level::Low));
    assert_eq!(config.database.host, "localhost");
    assert_eq!(config.replica, None);
}

#[test]
fn test_variables_override_document() {
    let config = load_with(
        &[
            ("TEST_NAME", "env-name"),
            ("TEST_PORT", "9000"),
            ("TEST_DEBUG", "true"),
            ("TEST_TIMEOUT", "1m"),
            ("TEST_LEVEL", "high"),
            ("TEST_DB_HOST", "db.internal"),
        ],
        DOCUMENT,
    )
    .unwrap();

    assert_eq!(config.name, "env-name");
    assert_eq!(config.port, 9000);
    assert!(config.debug);
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.level, Some(Level::High));
    assert_eq!(config.database.host, "db.internal");
    assert_eq!(config.database.port, 5432);
}

#[test]
fn test_optional_values() {
    let cleared = load_with(&[("TEST_LIMIT", "null")], DOCUMENT).unwrap();
    assert_eq!(cleared.limit, None);

    let source = DOCUMENT.replace("limit: 5", "limit: null");
    let allocated = load_with(&[("TEST_LIMIT", "7")], &source).unwrap();
    assert_eq!(allocated.limit, Some(7));

    let replaced = load_with(&[("TEST_LIMIT", "12")], DOCUMENT).unwrap();
    assert_eq!(replaced.limit, Some(12));
}

#[test]
fn test_absent_optional_struct_is_not_allocated() {
    let config = load_with(&[("TEST_DB_PORT", "6543")], DOCUMENT).unwrap();

    assert_eq!(config.database.port, 6543);
    assert_eq!(config.replica, None);

    let source = DOCUMENT.replace("replica: null", "replica:\n  host: replica\n  port: 5433");
    let config = load_with(&[("TEST_DB_PORT", "6543")], &source).unwrap();
    assert_eq!(
        config.replica,
        Some(Database {
            host: "replica".to_string(),
            port: 6543
        })
    );
}

#[test]
fn test_invalid_values() {
    colored::control::set_override(false);

    let error = load_with(&[("TEST_PORT", "http")], DOCUMENT).unwrap_err();
    match &error {
        Error::InvalidEnvValue {
            path,
            var,
            expected,
            reason,
        } => {
            assert_eq!(path, "Config.port");
            assert_eq!(var, "TEST_PORT");
            assert_eq!(expected, "u16");
            assert!(reason.is_some());
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(error
        .to_string()
        .starts_with("at Config.port: invalid env var TEST_PORT: expected u16"));

    let error = load_with(&[("TEST_DEBUG", "yes")], DOCUMENT).unwrap_err();
    assert!(error.to_string().contains("must be either false or true"));

    let error = load_with(&[("TEST_DB_PORT", "-1")], DOCUMENT).unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidEnvValue { ref path, .. } if path == "Config.database.port"
    ));

    let error = load_with(&[("TEST_LEVEL", "medium")], DOCUMENT).unwrap_err();
    match error {
        Error::InvalidEnvValue { reason, .. } => {
            assert_eq!(reason.as_deref(), Some("unknown level \"medium\""));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_dotenv_file() {
    let config: Config = Loader::new()
        .with_env(env::from_dotenv_file("test.env").unwrap())
        .load(DOCUMENT)
        .unwrap();

    assert_eq!(config.port, 9090);
    assert_eq!(config.name, "from-dotenv");
    assert!(config.debug);
}

#[derive(Debug, PartialEq, Setting)]
#[config(from_node)]
struct Pair {
    pub left: String,
    pub right: String,
}

impl FromNode for Pair {
    fn from_node(node: &Node) -> Result<Self, BoxError> {
        if node.is_mapping() {
            let side = |key: &str| {
                node.get(key)
                    .map(|value| value.value.clone())
                    .ok_or_else(|| format!("missing {}", key))
            };
            return Ok(Pair {
                left: side("left")?,
                right: side("right")?,
            });
        }
        let (left, right) = node.value.split_once(',').ok_or("expected left,right")?;
        Ok(Pair {
            left: left.to_string(),
            right: right.to_string(),
        })
    }
}

#[derive(Debug, Setting)]
struct Route {
    #[field(yaml = "pair", env = "TEST_ROUTE_PAIR")]
    pub pair: Pair,
    #[field(yaml = "fallback", env = "TEST_ROUTE_FALLBACK")]
    pub fallback: Option<Pair>,
}

const ROUTE: &str = "\
pair:
  left: p
  right: q
fallback: null
";

fn pair(left: &str, right: &str) -> Pair {
    Pair {
        left: left.to_string(),
        right: right.to_string(),
    }
}

#[test]
fn test_node_decoded_type() {
    let route: Route = Loader::new().with_env(vars(&[])).load(ROUTE).unwrap();
    assert_eq!(route.pair, pair("p", "q"));
    assert_eq!(route.fallback, None);

    let route: Route = Loader::new()
        .with_env(vars(&[
            ("TEST_ROUTE_PAIR", "x,y"),
            ("TEST_ROUTE_FALLBACK", "a,b"),
        ]))
        .load(ROUTE)
        .unwrap();
    assert_eq!(route.pair, pair("x", "y"));
    assert_eq!(route.fallback, Some(pair("a", "b")));
}

#[test]
fn test_node_decoded_type_errors() {
    let error = Loader::<Route>::new()
        .with_env(vars(&[("TEST_ROUTE_PAIR", "xy")]))
        .load(ROUTE)
        .unwrap_err();
    match error {
        Error::InvalidEnvValue { path, reason, .. } => {
            assert_eq!(path, "Route.pair");
            assert_eq!(reason.as_deref(), Some("expected left,right"));
        }
        other => panic!("unexpected error {:?}", other),
    }

    let error = Loader::<Route>::new()
        .with_env(vars(&[]))
        .load(&ROUTE.replace("  right: q\n", ""))
        .unwrap_err();
    assert_eq!(error.position().map(|p| p.line), Some(2));
}

#[derive(Debug, Setting)]
struct ProcessConfig {
    #[field(yaml = "workers", env = "YAML_LOADR_TEST_WORKERS")]
    pub workers: u8,
}

#[test]
fn test_process_environment() {
    std::env::set_var("YAML_LOADR_TEST_WORKERS", "16");

    let config: ProcessConfig = Loader::new().with_env(ProcessEnv).load("workers: 4\n").unwrap();
    assert_eq!(config.workers, 16);

    let config: ProcessConfig = yaml_loadr::load("workers: 4\n").unwrap();
    assert_eq!(config.workers, 16);

    std::env::remove_var("YAML_LOADR_TEST_WORKERS");
}

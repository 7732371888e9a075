use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use yaml_loadr::{
    validate_type, BoxError, Capability, Error, FromNode, FromText, Node, Setting, ShapeViolation,
};

fn violation<T: Setting>() -> (String, ShapeViolation) {
    match validate_type::<T>() {
        Err(Error::Shape { path, violation }) => (path, violation),
        other => panic!("expected a shape violation, got {:?}", other),
    }
}

#[derive(Setting)]
struct Server {
    #[field(yaml = "host", env = "TEST_SHAPE_HOST")]
    pub host: String,
    #[field(yaml = "port")]
    pub port: u16,
}

#[derive(Debug, PartialEq)]
#[derive(Setting)]
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

#[derive(Setting)]
struct Complete {
    #[field(yaml = "name", env = "TEST_SHAPE_NAME")]
    pub name: String,
    #[field(yaml = "server")]
    pub server: Server,
    #[field(yaml = "backup")]
    pub backup: Option<Server>,
    #[field(yaml = "replicas")]
    pub replicas: Vec<Server>,
    #[field(yaml = "pair")]
    pub pair: [u8; 2],
    #[field(yaml = "labels")]
    pub labels: HashMap<String, String>,
    #[field(yaml = "zones")]
    pub zones: BTreeMap<String, Option<Server>>,
    #[field(yaml = "levels")]
    pub levels: HashMap<String, Level>,
    #[field(yaml = "level", env = "TEST_SHAPE_LEVEL")]
    pub level: Option<Level>,
    #[field(yaml = "timeout", env = "TEST_SHAPE_TIMEOUT")]
    pub timeout: Duration,
    #[field(yaml = "ratio")]
    pub ratio: Option<f64>,
    cache: Vec<String>,
}

#[test]
fn test_complete_type_is_valid() {
    validate_type::<Complete>().unwrap();
}

#[derive(Setting)]
struct UntaggedField {
    #[field(yaml = "a")]
    pub a: u8,
    pub b: u8,
}

#[test]
fn test_missing_yaml_tag() {
    assert_eq!(
        violation::<UntaggedField>(),
        ("UntaggedField.b".to_string(), ShapeViolation::MissingYamlTag)
    );
}

#[derive(Setting)]
struct TaggedPrivate {
    #[field(yaml = "a")]
    pub a: u8,
    #[field(yaml = "b")]
    b: u8,
}

#[test]
fn test_yaml_tag_on_private_field() {
    assert_eq!(
        violation::<TaggedPrivate>(),
        ("TaggedPrivate.b".to_string(), ShapeViolation::YamlTagOnUnexported)
    );
}

#[derive(Setting)]
struct DuplicateTag {
    #[field(yaml = "x")]
    pub first: u8,
    #[field(yaml = "x")]
    pub second: u8,
}

#[test]
fn test_duplicate_yaml_tag() {
    assert_eq!(
        violation::<DuplicateTag>(),
        (
            "DuplicateTag.second".to_string(),
            ShapeViolation::YamlTagRedefined {
                tag: "x".to_string(),
                previous: "DuplicateTag.first".to_string(),
            }
        )
    );
}

#[derive(Setting)]
struct EnvOnPrivate {
    #[field(yaml = "a")]
    pub a: u8,
    #[field(env = "TEST_SHAPE_SECRET")]
    secret: String,
}

#[test]
fn test_env_tag_on_private_field() {
    assert_eq!(
        violation::<EnvOnPrivate>(),
        ("EnvOnPrivate.secret".to_string(), ShapeViolation::EnvTagOnUnexported)
    );
}

#[derive(Setting)]
struct BadEnvName {
    #[field(yaml = "a", env = "lower_case")]
    pub a: u8,
}

#[test]
fn test_env_tag_must_be_posix() {
    assert_eq!(
        violation::<BadEnvName>(),
        (
            "BadEnvName.a".to_string(),
            ShapeViolation::InvalidEnvTag {
                tag: "lower_case".to_string()
            }
        )
    );
}

#[derive(Setting)]
struct EnvOnList {
    #[field(yaml = "items", env = "TEST_SHAPE_ITEMS")]
    pub items: Vec<u8>,
}

#[derive(Setting)]
struct EnvOnStruct {
    #[field(yaml = "server", env = "TEST_SHAPE_SERVER")]
    pub server: Server,
}

#[test]
fn test_env_tag_on_unsupported_types() {
    assert_eq!(
        violation::<EnvOnList>(),
        (
            "EnvOnList.items".to_string(),
            ShapeViolation::EnvOnUnsupportedType {
                type_name: "Vec<u8>".to_string()
            }
        )
    );

    let (path, found) = violation::<EnvOnStruct>();
    assert_eq!(path, "EnvOnStruct.server");
    assert!(matches!(found, ShapeViolation::EnvOnUnsupportedType { .. }));
}

#[derive(Setting)]
#[config(from_text)]
struct Endpoint {
    #[field(yaml = "url")]
    pub url: String,
}

impl FromText for Endpoint {
    fn from_text(text: &str) -> Result<Self, BoxError> {
        Ok(Endpoint {
            url: text.to_string(),
        })
    }
}

#[derive(Setting)]
struct WithEndpoint {
    #[field(yaml = "endpoint")]
    pub endpoint: Endpoint,
}

#[test]
fn test_tags_inside_custom_decode_type() {
    assert_eq!(
        violation::<WithEndpoint>(),
        (
            "WithEndpoint.endpoint.url".to_string(),
            ShapeViolation::TagOnCustomDecode {
                capability: Capability::Text,
                attribute: "yaml",
                tag: "url".to_string(),
            }
        )
    );
}

#[derive(Setting)]
#[config(from_node)]
struct Coordinates {
    #[field(env = "TEST_SHAPE_LAT")]
    pub lat: f64,
    pub lon: f64,
}

impl FromNode for Coordinates {
    fn from_node(node: &Node) -> Result<Self, BoxError> {
        let (lat, lon) = node.value.split_once(',').ok_or("expected lat,lon")?;
        Ok(Coordinates {
            lat: lat.trim().parse()?,
            lon: lon.trim().parse()?,
        })
    }
}

#[derive(Setting)]
struct WithCoordinates {
    #[field(yaml = "origin")]
    pub origin: Coordinates,
}

#[test]
fn test_tags_inside_node_decode_type() {
    assert_eq!(
        violation::<WithCoordinates>(),
        (
            "WithCoordinates.origin.lat".to_string(),
            ShapeViolation::TagOnCustomDecode {
                capability: Capability::Node,
                attribute: "env",
                tag: "TEST_SHAPE_LAT".to_string(),
            }
        )
    );
}

#[derive(Setting)]
struct OnlyPrivate {
    hidden: u8,
}

#[derive(Setting)]
struct WithOnlyPrivate {
    #[field(yaml = "inner")]
    pub inner: OnlyPrivate,
}

#[test]
fn test_no_exported_fields() {
    assert_eq!(
        violation::<OnlyPrivate>(),
        ("OnlyPrivate".to_string(), ShapeViolation::NoExportedFields)
    );
    assert_eq!(
        violation::<WithOnlyPrivate>(),
        ("WithOnlyPrivate.inner".to_string(), ShapeViolation::NoExportedFields)
    );
}

#[derive(Setting)]
struct OptionalList {
    #[field(yaml = "items")]
    pub items: Option<Vec<u8>>,
}

#[derive(Setting)]
struct OptionalOptional {
    #[field(yaml = "value")]
    pub value: Option<Option<u8>>,
}

#[derive(Setting)]
struct OptionalArray {
    #[field(yaml = "pair")]
    pub pair: Option<[u8; 2]>,
}

#[derive(Setting)]
struct OptionalMap {
    #[field(yaml = "labels")]
    pub labels: Option<HashMap<String, String>>,
}

#[test]
fn test_unsupported_optionals() {
    for (path, found) in [
        violation::<OptionalList>(),
        violation::<OptionalOptional>(),
        violation::<OptionalArray>(),
        violation::<OptionalMap>(),
    ] {
        assert!(
            matches!(found, ShapeViolation::UnsupportedPointer { .. }),
            "{}: {:?}",
            path,
            found
        );
    }
}

#[derive(Setting)]
struct WithUsize {
    #[field(yaml = "count")]
    pub count: usize,
}

#[derive(Setting)]
struct WithCallback {
    #[field(yaml = "callback")]
    pub callback: fn(u8) -> u8,
}

#[derive(Setting)]
struct WithAny {
    #[field(yaml = "anything")]
    pub anything: Vec<Box<dyn std::any::Any>>,
}

#[derive(Setting)]
struct WithChannel {
    #[field(yaml = "channel")]
    pub channel: Option<std::sync::mpsc::Sender<u8>>,
}

#[derive(Setting)]
struct WithRawPointer {
    #[field(yaml = "address")]
    pub address: *const u8,
}

#[derive(Setting)]
struct WithMutPointer {
    #[field(yaml = "buffer")]
    pub buffer: Option<*mut u32>,
}

#[derive(Setting)]
struct WithStructMap {
    #[field(yaml = "servers")]
    pub servers: HashMap<String, Server>,
}

#[derive(Setting)]
struct WithBadKey {
    #[field(yaml = "by_index")]
    pub by_index: BTreeMap<usize, String>,
}

#[test]
fn test_unsupported_types() {
    let (path, found) = violation::<WithUsize>();
    assert_eq!(path, "WithUsize.count");
    assert_eq!(
        found,
        ShapeViolation::UnsupportedType {
            type_name: "usize".to_string(),
            hint: Some(
                "use integer type with specified width, such as i32 or i64 instead of isize"
            ),
        }
    );

    for (path, found) in [
        violation::<WithCallback>(),
        violation::<WithAny>(),
        violation::<WithChannel>(),
        violation::<WithBadKey>(),
    ] {
        assert!(
            matches!(found, ShapeViolation::UnsupportedType { .. }),
            "{}: {:?}",
            path,
            found
        );
    }
}

#[test]
fn test_raw_pointers() {
    assert_eq!(
        violation::<WithRawPointer>(),
        (
            "WithRawPointer.address".to_string(),
            ShapeViolation::UnsupportedType {
                type_name: "*const u8".to_string(),
                hint: None,
            }
        )
    );
    assert_eq!(
        violation::<WithMutPointer>(),
        (
            "WithMutPointer.buffer".to_string(),
            ShapeViolation::UnsupportedType {
                type_name: "*mut u32".to_string(),
                hint: None,
            }
        )
    );
}

#[test]
fn test_struct_map_values_need_option() {
    let (path, found) = violation::<WithStructMap>();
    assert_eq!(path, "WithStructMap.servers");
    assert!(matches!(
        found,
        ShapeViolation::UnsupportedType {
            hint: Some("use Option of struct as map value"),
            ..
        }
    ));
}

#[derive(Setting)]
struct Tree {
    #[field(yaml = "children")]
    pub children: Vec<Tree>,
}

#[derive(Setting)]
struct Forest {
    #[field(yaml = "trees")]
    pub trees: BTreeMap<String, Option<Tree>>,
}

#[derive(Setting)]
struct Ping {
    #[field(yaml = "pong")]
    pub pong: Vec<Pong>,
}

#[derive(Setting)]
struct Pong {
    #[field(yaml = "ping")]
    pub ping: Option<Ping>,
}

#[test]
fn test_recursive_types() {
    assert_eq!(
        violation::<Tree>(),
        ("Tree.children".to_string(), ShapeViolation::RecursiveType)
    );
    assert_eq!(
        violation::<Forest>(),
        ("Forest.trees.children".to_string(), ShapeViolation::RecursiveType)
    );
    assert_eq!(
        violation::<Ping>(),
        ("Ping.pong.ping".to_string(), ShapeViolation::RecursiveType)
    );
}

#[test]
fn test_custom_decode_root_is_illegal() {
    assert_eq!(
        violation::<Level>(),
        ("Level".to_string(), ShapeViolation::IllegalRootType)
    );
    assert_eq!(
        violation::<Coordinates>(),
        ("Coordinates".to_string(), ShapeViolation::IllegalRootType)
    );
    assert_eq!(
        violation::<Vec<Server>>().1,
        ShapeViolation::IllegalRootType
    );
}

#[test]
fn test_shape_error_message() {
    colored::control::set_override(false);

    let error = validate_type::<OptionalList>().unwrap_err();
    assert_eq!(
        error.to_string(),
        "at OptionalList.items: unsupported optional type Option<Vec<u8>>: \
         only optional scalars and structs are allowed"
    );
}

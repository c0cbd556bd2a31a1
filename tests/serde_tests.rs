#[cfg(feature = "serde")]
mod serde_tests {
    use std::path::PathBuf;

    use zigify::{Environment, NodeKind, Options, Transpiler, Warning, ZigifyError};

    #[test]
    #[ntest::timeout(100)]
    fn test_options_default_every_field() {
        let options: Options = serde_json::from_str("{}").unwrap();
        assert_eq!(options, Options::default());
        assert!(options.prelude);
        assert_eq!(options.max_include_depth, 64);

        let options: Options =
            serde_json::from_str(r#"{"prelude":false,"include_dirs":["/opt/bmake"]}"#).unwrap();
        assert!(!options.prelude);
        assert_eq!(options.include_dirs, vec![PathBuf::from("/opt/bmake")]);
        assert_eq!(options.append_separator, "");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_serialization() {
        let err = ZigifyError::IncludeCycle {
            chain: vec!["a.mki".to_string(), "a.mki".to_string()],
        };
        let serialized = serde_json::to_string(&err).unwrap();
        assert_eq!(serialized, r#"{"IncludeCycle":{"chain":["a.mki","a.mki"]}}"#);

        let deserialized: ZigifyError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, err);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_node_kind_serialization() {
        let serialized = serde_json::to_string(&NodeKind::Other("dep_ext".to_string())).unwrap();
        assert_eq!(serialized, r#"{"Other":"dep_ext"}"#);
        let deserialized: NodeKind = serde_json::from_str(r#""AppendAssign""#).unwrap();
        assert_eq!(deserialized, NodeKind::AppendAssign);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_environment_serialization() {
        let mut environment = Environment::new();
        environment.assign("CC", "clang");
        environment.assign("GONE", "x");
        environment.undefine("GONE");

        let serialized = serde_json::to_string(&environment).unwrap();
        assert_eq!(serialized, r#"{"values":{"CC":"clang"},"bound":["CC","GONE"]}"#);

        let deserialized: Environment = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, environment);
        assert_eq!(deserialized.bound_names().count(), 2);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_transpilation_serialization() {
        let transpiler = Transpiler::with_options(Options::new().with_prelude(false));
        let result = transpiler
            .transpile("X = 1\n", Environment::new())
            .unwrap();

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["output"], "vars.X = \"1\";");
        assert_eq!(value["environment"]["values"]["X"], "1");
        assert_eq!(value["warnings"], serde_json::json!([]));

        let warning = Warning {
            line: 3,
            message: "verbatim".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&warning).unwrap(),
            r#"{"line":3,"message":"verbatim"}"#
        );
    }
}

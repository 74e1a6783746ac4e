//! Property tests for whole-project compilation.

use proptest::prelude::*;

use dataform_compiler::{compile, CompileOptions, NoScriptRuntime, ProjectFiles};

const SETTINGS: &str = "defaultProject: proj\ndefaultDataset: analytics\ndefaultLocation: US\n";

fn table_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_]{0,10}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: compilation never panics on arbitrary definition files.
    #[test]
    fn property_compile_never_panics(
        sqlx in "(?s).{0,200}",
        yaml in "(?s).{0,120}",
    ) {
        let mut files = ProjectFiles::new();
        files.insert("workflow_settings.yaml", SETTINGS);
        files.insert("definitions/t.sqlx", sqlx);
        files.insert("definitions/actions.yaml", yaml);
        let _ = compile(&files, &NoScriptRuntime, &CompileOptions::default());
    }

    /// PROPERTY: file order never changes the result of a linear chain.
    #[test]
    fn property_chain_links_in_any_order(
        names in proptest::collection::btree_set(table_name(), 2..6),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let mut files = ProjectFiles::new();
        files.insert("workflow_settings.yaml", SETTINGS);
        files.insert(format!("definitions/{}.sqlx", names[0]), "SELECT 1 AS x");
        for pair in names.windows(2) {
            files.insert(
                format!("definitions/{}.sqlx", pair[1]),
                format!("SELECT * FROM ${{ref(\"{}\")}}", pair[0]),
            );
        }

        let graph = compile(&files, &NoScriptRuntime, &CompileOptions::default()).unwrap();
        prop_assert!(!graph.has_errors(), "{:?}", graph.errors());
        prop_assert_eq!(graph.tables.len(), names.len());
        for pair in names.windows(2) {
            let table = graph.table(&pair[1]).unwrap();
            prop_assert_eq!(table.common.dependency_targets.len(), 1);
            prop_assert_eq!(&table.common.dependency_targets[0].name, &pair[0]);
        }
    }
}

//! Cycle contracts (CYCLE-001)
//!
//! A cycle of length n is reported as one chain of n+1 targets that ends
//! where it started.

use crate::common::*;

fn ring(length: usize) -> Project {
    let mut project = Project::new();
    for i in 0..length {
        let next = (i + 1) % length;
        project = project.definition(
            &format!("n{}.sqlx", i),
            &format!("SELECT * FROM ${{ref(\"n{}\")}}", next),
        );
    }
    project
}

fn chain_of(message: &str) -> Vec<String> {
    let start = message.find('[').expect("chain start");
    let end = message.rfind(']').expect("chain end");
    message[start + 1..end]
        .split(" > ")
        .map(str::to_string)
        .collect()
}

/// CONTRACT CYCLE-001: Full chain, closed at the start
mod chain {
    use super::*;

    #[test]
    fn contract_cycles_report_every_member() {
        for length in 2..=5 {
            let graph = ring(length).compile();
            let messages = messages(&graph);
            assert_eq!(messages.len(), 1, "length {length}: {messages:?}");
            assert!(messages[0].starts_with("Circular dependency detected in chain: "));

            let chain = chain_of(&messages[0]);
            assert_eq!(chain.len(), length + 1, "{:?}", chain);
            assert_eq!(chain.first(), chain.last());
        }
    }

    #[test]
    fn contract_self_reference_is_a_cycle_of_one() {
        let graph = Project::new()
            .definition("me.sqlx", r#"SELECT * FROM ${ref("me")}"#)
            .compile();
        let chain = chain_of(&messages(&graph)[0]);
        assert_eq!(chain, vec!["proj.analytics.me", "proj.analytics.me"]);
    }

    #[test]
    fn contract_acyclic_graph_has_no_cycle_error() {
        let graph = Project::new()
            .definition("raw.sqlx", SOURCE_DECLARATION)
            .definition("orders.sqlx", ORDERS_TABLE)
            .definition("daily.sqlx", DAILY_VIEW)
            .compile();
        assert!(!graph.has_errors(), "{:?}", messages(&graph));
    }
}

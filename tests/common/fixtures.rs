//! Test fixtures - reusable content constants for tests.

/// BigQuery settings with every default a clean compile needs
pub const SETTINGS: &str = "\
defaultProject: proj
defaultDataset: analytics
defaultLocation: US
";

/// Same defaults plus the environment transforms
pub const SETTINGS_WITH_TRANSFORMS: &str = "\
defaultProject: proj
defaultDataset: analytics
defaultLocation: US
projectSuffix: dev
datasetSuffix: staging
namePrefix: tmp
";

/// A declared source table
pub const SOURCE_DECLARATION: &str = r#"config { type: "declaration", name: "raw_orders" }"#;

/// A table reading from the declared source
pub const ORDERS_TABLE: &str = r#"config {
  type: "table",
  description: "Cleaned orders",
  assertions: { nonNull: ["order_id"], rowConditions: ["amount >= 0"] }
}
SELECT order_id, amount FROM ${ref("raw_orders")}
"#;

/// A view depending on the table
pub const DAILY_VIEW: &str = r#"config { type: "view" }
SELECT DATE(created_at) AS day, SUM(amount) AS total
FROM ${ref("orders")}
GROUP BY 1
"#;

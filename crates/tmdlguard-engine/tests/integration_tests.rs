//! End-to-end validation tests over temporary project trees

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tmdlguard_core::{Config, Diagnostic, ErrorCategory, LintCode, RuleCode};
use tmdlguard_engine::validate_project;

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join("definition").join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

const DATABASE: &str = "database AdventureWorks\n\tcompatibilityLevel: 1567\n";

const MODEL: &str = "\
model Model
\tculture: en-US
\tdefaultPowerBIDataSourceVersion: powerBI_V3

ref table Sales
ref table Product
";

const PRODUCT: &str = "\
table Product
\tlineageTag: 6f0f2c1e

\tcolumn ProductKey
\t\tdataType: int64
\t\tisKey
\t\tsummarizeBy: none
\t\tsourceColumn: ProductKey

\tcolumn Name
\t\tdataType: string
\t\tsourceColumn: Name

\tpartition Product = m
\t\tmode: import
\t\tsource =
\t\t\t\tlet
\t\t\t\t    Source = Sql.Database(\"server\", \"db\")
\t\t\t\tin
\t\t\t\t    Source
";

const SALES: &str = "\
table Sales

\tmeasure 'Total Amount' = SUM(Sales[Amount])
\t\tformatString: #,0.00

\tcolumn ProductKey
\t\tdataType: int64
\t\tsourceColumn: ProductKey

\tcolumn Amount
\t\tdataType: decimal
\t\tsourceColumn: Amount

\tpartition Sales = m
\t\tmode: import
\t\tsource = Sql.Database(\"server\", \"db\")
";

const RELATIONSHIPS: &str = "\
relationship 3b1c2d7e
\tfromColumn: Sales.ProductKey
\ttoColumn: Product.ProductKey
";

fn valid_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "database.tmdl", DATABASE);
    write(root, "model.tmdl", MODEL);
    write(root, "relationships.tmdl", RELATIONSHIPS);
    write(root, "tables/Product.tmdl", PRODUCT);
    write(root, "tables/Sales.tmdl", SALES);
    write(root, "cultures/en-US.tmdl", "cultureInfo en-US\n");
    dir
}

fn failure_of(diagnostic: &Diagnostic) -> &tmdlguard_core::Failure {
    diagnostic.as_failure().expect("expected a failure")
}

#[test]
fn test_minimal_valid_project() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "database.tmdl", "database Minimal\n\tcompatibilityLevel: 1550\n");
    write(dir.path(), "model.tmdl", "model Model\n");

    let outcome = validate_project(dir.path(), &Config::default());
    assert_eq!(outcome.diagnostic, Diagnostic::success("Minimal", 1550));
}

#[test]
fn test_full_project_is_valid() {
    let dir = valid_project();
    let outcome = validate_project(dir.path(), &Config::default());
    assert_eq!(outcome.diagnostic, Diagnostic::success("AdventureWorks", 1567));
    assert!(outcome.warnings.is_empty());

    let report = outcome.to_report(dir.path().display().to_string());
    assert!(report.is_valid);
    assert_eq!(report.database_name.as_deref(), Some("AdventureWorks"));
}

#[test]
fn test_missing_definition_folder() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("model.tmdl"), "model Model\n").unwrap();

    let outcome = validate_project(dir.path(), &Config::default());
    assert_eq!(outcome.diagnostic.category(), Some(ErrorCategory::InvalidStructure));
}

#[test]
fn test_missing_root() {
    let dir = TempDir::new().unwrap();
    let outcome = validate_project(&dir.path().join("absent"), &Config::default());
    assert_eq!(outcome.diagnostic.category(), Some(ErrorCategory::PathNotFound));
}

#[test]
fn test_validation_is_idempotent() {
    let dir = valid_project();
    write(dir.path(), "tables/Sales.tmdl", "table Sales\n\tcolumn Amount\n\tcolumn Amount\n");

    let first = validate_project(dir.path(), &Config::default());
    let second = validate_project(dir.path(), &Config::default());
    assert_eq!(first, second);
}

#[test]
fn test_indentation_width_does_not_matter() {
    let tabs = valid_project();
    let spaces = valid_project();
    write(spaces.path(), "tables/Product.tmdl", &PRODUCT.replace('\t', "  "));
    write(spaces.path(), "tables/Sales.tmdl", &SALES.replace('\t', "    "));

    let a = validate_project(tabs.path(), &Config::default());
    let b = validate_project(spaces.path(), &Config::default());
    assert_eq!(a.diagnostic, b.diagnostic);
    assert!(b.is_valid());
}

#[test]
fn test_scenario_duplicate_column() {
    let dir = valid_project();
    let sales = SALES.replace(
        "\tcolumn Amount\n",
        "\tcolumn Amount\n\t\tdataType: decimal\n\n\tcolumn Amount\n",
    );
    write(dir.path(), "tables/Sales.tmdl", &sales);

    let outcome = validate_project(dir.path(), &Config::default());
    let failure = failure_of(&outcome.diagnostic);
    assert_eq!(failure.category, ErrorCategory::SerializationError);
    assert!(failure.message.to_lowercase().contains("duplicate"));
    assert_eq!(failure.rule, Some(RuleCode::DuplicateName));
}

#[test]
fn test_scenario_unresolved_relationship_table() {
    let dir = valid_project();
    write(
        dir.path(),
        "relationships.tmdl",
        &RELATIONSHIPS.replace("toColumn: Product.ProductKey", "toColumn: Products.ProductKey"),
    );

    let outcome = validate_project(dir.path(), &Config::default());
    let failure = failure_of(&outcome.diagnostic);
    assert_eq!(failure.category, ErrorCategory::SerializationError);
    assert!(failure.message.to_lowercase().contains("unresolved reference"));
    assert!(failure.message.contains("Products"));

    let position = failure.position.as_ref().unwrap();
    assert_eq!(position.document, "relationships.tmdl");
    assert_eq!(position.line, 3);
}

#[test]
fn test_scenario_bad_indentation() {
    let dir = valid_project();
    write(
        dir.path(),
        "tables/Sales.tmdl",
        "table Sales\n    column Amount\n        dataType: decimal\n  column Other\n",
    );

    let outcome = validate_project(dir.path(), &Config::default());
    let failure = failure_of(&outcome.diagnostic);
    assert_eq!(failure.category, ErrorCategory::FormatError);

    let position = failure.position.as_ref().unwrap();
    assert_eq!(position.document, "tables/Sales.tmdl");
    assert_eq!(position.line, 4);
    assert_eq!(position.line_text, "  column Other");
}

#[test]
fn test_scenario_feature_below_compatibility_level() {
    let dir = valid_project();
    write(dir.path(), "database.tmdl", "database AdventureWorks\n\tcompatibilityLevel: 1400\n");
    write(
        dir.path(),
        "tables/Time Intelligence.tmdl",
        "\
table 'Time Intelligence'
\tcalculationGroup
\t\tcalculationItem Current = SELECTEDMEASURE()

\tcolumn Name
\t\tdataType: string
\t\tsourceColumn: Name

\tpartition 'Time Intelligence' = calculationGroup
",
    );

    let outcome = validate_project(dir.path(), &Config::default());
    let failure = failure_of(&outcome.diagnostic);
    assert_eq!(failure.category, ErrorCategory::SerializationError);
    assert_eq!(failure.rule, Some(RuleCode::FeatureGate));
    assert!(failure.message.contains("calculationGroup"));
    assert!(failure.message.contains("1470"));
}

#[test]
fn test_parallel_and_sequential_agree() {
    let dir = valid_project();
    write(dir.path(), "tables/B.tmdl", "table B\n\tbogus words here\n");
    write(dir.path(), "tables/C.tmdl", "table C\n  column X\n column Y\n");

    let sequential = Config {
        parallel: false,
        ..Config::default()
    };
    let a = validate_project(dir.path(), &Config::default());
    let b = validate_project(dir.path(), &sequential);
    assert_eq!(a, b);
    assert_eq!(
        failure_of(&a.diagnostic).position.as_ref().unwrap().document,
        "tables/B.tmdl"
    );
}

#[test]
fn test_lint_warnings_do_not_change_validity() {
    let dir = valid_project();
    write(
        dir.path(),
        "tables/Extra.tmdl",
        "table Extra\n\tcolumn ' Padded'\n\t\tdataType: string\n",
    );

    let outcome = validate_project(dir.path(), &Config::default());
    assert!(outcome.is_valid());
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].code, LintCode::PaddedName);

    let mut config = Config::default();
    config.lint.enabled = false;
    let outcome = validate_project(dir.path(), &config);
    assert!(outcome.is_valid());
    assert!(outcome.warnings.is_empty());
}

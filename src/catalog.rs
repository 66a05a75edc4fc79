//! The built-in report sequence for the credit dataset

use crate::data::Schema;
use crate::error::{EdaError, Result};
use crate::report::Report;

/// Report definitions, in output order
pub const BUILTIN_REPORTS: [&str; 10] = [
    r#"idade_por_sexo: source(raw) | group(by: sexo, metric: idade, op: mean) | table()
        | labs(title: "Average Age by Gender", line: "Average age for gender {key} is {value}")"#,
    r#"distribuicao_sexo: source(raw) | group(by: sexo, op: count)
        | pie(colors: ["dodgerblue", "hotpink"]) | labs(title: "Gender Distribution")"#,
    r#"gasto_por_sexo: source(raw) | group(by: sexo, metric: valor_transacoes_12m, op: mean)
        | bar(colors: ["dodgerblue", "hotpink"])
        | labs(title: "Average Spending by Gender", x: "Gender", y: "Average Spending",
               line: "Average spending for gender {key} is {value}")"#,
    r#"faixa_salarial: source(clean) | group(by: salario_anual, op: count, order: "sorted")
        | bar(palette: "viridis")
        | labs(title: "Income Bracket Distribution", x: "Income Bracket", y: "Number of Customers")"#,
    r#"idade_por_salario: source(clean) | group(by: salario_anual, metric: idade, op: mean, order: "sorted")
        | bar(palette: "viridis")
        | labs(title: "Average Age by Income Bracket", x: "Income Bracket", y: "Average Age")"#,
    r#"gasto_por_escolaridade: source(clean) | group(by: escolaridade, metric: valor_transacoes_12m, op: mean)
        | bar(palette: "viridis")
        | labs(title: "Spending by Education", x: "Education", y: "Average Spending")"#,
    r#"gasto_por_estado_civil: source(clean) | group(by: estado_civil, metric: valor_transacoes_12m, op: mean)
        | bar(palette: "viridis")
        | labs(title: "Spending by Marital Status", x: "Marital Status", y: "Average Spending")"#,
    r#"gasto_por_dependentes: source(clean) | group(by: dependentes, metric: valor_transacoes_12m, op: mean)
        | bar(palette: "viridis")
        | labs(title: "Spending by Dependents", x: "Number of Dependents", y: "Average Spending")"#,
    r#"limite_por_cartao: source(clean) | group(by: tipo_cartao, metric: limite_credito, op: mean)
        | bar(palette: "viridis")
        | labs(title: "Credit Limit by Card Type", x: "Card Type", y: "Credit Limit")"#,
    r#"gasto_por_cartao: source(clean) | group(by: tipo_cartao, metric: valor_transacoes_12m, op: mean)
        | bar(palette: "viridis")
        | labs(title: "Spending by Card Type", x: "Card Type", y: "Average Spending")"#,
];

/// Parse the built-in reports followed by any extra definitions
pub fn reports(extra: &[String]) -> Result<Vec<Report>> {
    BUILTIN_REPORTS
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .enumerate()
        .map(|(idx, dsl)| Report::parse(idx + 1, dsl))
        .collect()
}

/// Check every report's columns against the schema before any data is read
pub fn validate(reports: &[Report], schema: &Schema) -> Result<()> {
    for report in reports {
        let query = &report.spec.query;
        schema.index_of(&query.group_by)?;
        if let Some(metric) = &query.metric {
            if !schema.column(metric)?.kind.is_numeric() {
                return Err(EdaError::NotNumeric(metric.clone()));
            }
        }
    }
    Ok(())
}

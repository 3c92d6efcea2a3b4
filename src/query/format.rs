//! Text rendering for query results.

use super::ast::QueryType;
use super::executor::{FieldValue, QueryResult, QueryRow};

/// Render rows in the shape the query type asks for.
pub fn render(result: &QueryResult) -> String {
    match result.query_type {
        QueryType::Table => render_table(result),
        QueryType::List => render_list(&result.rows),
        QueryType::Task => render_tasks(&result.rows),
    }
}

fn cell(row: &QueryRow, field: &str) -> String {
    row.get(field)
        .map(|v| v.to_string().replace('|', "\\|").replace('\n', " "))
        .unwrap_or_default()
}

fn render_table(result: &QueryResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", result.fields.join(" | ")));
    out.push_str(&format!(
        "|{}\n",
        result.fields.iter().map(|_| " --- |").collect::<String>()
    ));
    for row in &result.rows {
        let cells: Vec<String> = result.fields.iter().map(|f| cell(row, f)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

fn render_list(rows: &[QueryRow]) -> String {
    rows.iter()
        .map(|row| format!("- {} ({})\n", cell(row, "title"), cell(row, "path")))
        .collect()
}

fn render_tasks(rows: &[QueryRow]) -> String {
    rows.iter()
        .map(|row| {
            let done = row.get("verified").map_or(false, FieldValue::as_bool);
            format!("- [{}] {}\n", if done { "x" } else { " " }, cell(row, "title"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, FieldValue)]) -> QueryRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn result(query_type: QueryType, fields: &[&str], rows: Vec<QueryRow>) -> QueryResult {
        QueryResult {
            query_type,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            total: rows.len(),
            rows,
        }
    }

    #[test]
    fn test_table_renders_markdown() {
        let r = result(
            QueryType::Table,
            &["path", "title", "tags", "confidence"],
            vec![row(&[
                ("path", FieldValue::Text("a.md".into())),
                ("title", FieldValue::Text("A|B".into())),
                ("tags", FieldValue::List(vec!["x".into(), "y".into()])),
                ("confidence", FieldValue::Null),
            ])],
        );
        assert_eq!(
            render(&r),
            "| path | title | tags | confidence |\n| --- | --- | --- | --- |\n| a.md | A\\|B | x, y |  |\n"
        );
    }

    #[test]
    fn test_list_and_task() {
        let rows = vec![
            row(&[
                ("path", FieldValue::Text("a.md".into())),
                ("title", FieldValue::Text("Alpha".into())),
                ("verified", FieldValue::Bool(true)),
            ]),
            row(&[
                ("path", FieldValue::Text("b.md".into())),
                ("title", FieldValue::Text("Beta".into())),
            ]),
        ];
        let list = result(QueryType::List, &["path", "title"], rows.clone());
        assert_eq!(render(&list), "- Alpha (a.md)\n- Beta (b.md)\n");

        let tasks = result(QueryType::Task, &["path", "title"], rows);
        assert_eq!(render(&tasks), "- [x] Alpha\n- [ ] Beta\n");
    }
}

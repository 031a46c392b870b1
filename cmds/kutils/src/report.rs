//! Report rendering: gtmpl templates, HTML/CSV tables and aligned terminal tables.

use std::{collections::HashMap, io::Write};

use anyhow::{Context as _, Result};
use gtmpl::{Context, Template, Value};
use serde_json::{json, Value as JsonValue};
use tabwriter::TabWriter;

/// Convert serde_json::Value to gtmpl::Value
pub fn json_to_gtmpl(value: &JsonValue) -> Value {
	match value {
		JsonValue::Null => Value::Nil,
		JsonValue::Bool(b) => Value::Bool(*b),
		JsonValue::Number(n) => {
			if let Some(i) = n.as_i64() {
				Value::Number(i.into())
			} else if let Some(f) = n.as_f64() {
				Value::Number(f.into())
			} else {
				Value::Nil
			}
		}
		JsonValue::String(s) => Value::String(s.clone()),
		JsonValue::Array(arr) => Value::Array(arr.iter().map(json_to_gtmpl).collect()),
		JsonValue::Object(obj) => {
			let map: HashMap<String, Value> = obj
				.iter()
				.map(|(k, v)| (k.clone(), json_to_gtmpl(v)))
				.collect();
			Value::Map(map)
		}
	}
}

/// Render a Go text/template with a JSON context
pub fn render(template: &str, data: &JsonValue) -> Result<String> {
	let mut tmpl = Template::default();
	tmpl.parse(template)?;
	let context = Context::from(json_to_gtmpl(data));
	tmpl.render(&context)
		.map_err(|e| anyhow::anyhow!("Template error: {:?}", e))
}

const TABLE_HTML: &str = r#"<table border="1" cellpadding="5">
<tr>{{range .headers}}<th>{{.}}</th>{{end}}</tr>
{{range .rows}}<tr>{{range .}}<td>{{.}}</td>{{end}}</tr>
{{end}}</table>
"#;

/// Rows of text cells under a header line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
	pub headers: Vec<String>,
	pub rows: Vec<Vec<String>>,
}

impl Table {
	pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
		Self {
			headers: headers.into_iter().map(Into::into).collect(),
			rows: Vec::new(),
		}
	}

	pub fn push<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
		self.rows.push(row.into_iter().map(Into::into).collect());
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// `<table>` element with escaped cells
	pub fn to_html(&self) -> Result<String> {
		let escape_row = |row: &Vec<String>| row.iter().map(|cell| escape_html(cell)).collect::<Vec<_>>();
		let rows: Vec<Vec<String>> = self.rows.iter().map(escape_row).collect();
		render(TABLE_HTML, &json!({"headers": escape_row(&self.headers), "rows": rows}))
	}

	pub fn to_csv(&self) -> String {
		let mut out = String::new();
		for row in std::iter::once(&self.headers).chain(&self.rows) {
			let cells: Vec<String> = row.iter().map(|cell| csv_cell(cell)).collect();
			out.push_str(&cells.join(","));
			out.push('\n');
		}
		out
	}

	/// Tab aligned rendering for the terminal
	pub fn write_text<W: Write>(&self, writer: W) -> Result<()> {
		let mut tw = TabWriter::new(writer).padding(2);
		for row in std::iter::once(&self.headers).chain(&self.rows) {
			writeln!(tw, "{}", row.join("\t"))?;
		}
		tw.flush().context("failed to write table")?;
		Ok(())
	}
}

fn csv_cell(cell: &str) -> String {
	if cell.contains([',', '"', '\n']) {
		format!("\"{}\"", cell.replace('"', "\"\""))
	} else {
		cell.to_string()
	}
}

/// Parse CSV text with a header line into a table. Quoted cells may contain commas and `""`.
pub fn parse_csv(content: &str) -> Table {
	let mut lines = content.lines().filter(|line| !line.trim().is_empty());
	let headers = lines.next().map(split_csv_line).unwrap_or_default();
	Table {
		headers,
		rows: lines.map(split_csv_line).collect(),
	}
}

fn split_csv_line(line: &str) -> Vec<String> {
	let mut cells = Vec::new();
	let mut cell = String::new();
	let mut quoted = false;
	let mut chars = line.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'"' if quoted && chars.peek() == Some(&'"') => {
				cell.push('"');
				chars.next();
			}
			'"' => quoted = !quoted,
			',' if !quoted => cells.push(std::mem::take(&mut cell)),
			c => cell.push(c),
		}
	}
	cells.push(cell);
	cells
}

/// Whole numbers without a fraction, everything else as is
pub fn fmt_number(value: f64) -> String {
	if value.fract() == 0.0 && value.abs() < 1e15 {
		format!("{}", value as i64)
	} else {
		value.to_string()
	}
}

/// Escape text placed into HTML element content or attributes
pub fn escape_html(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			c => out.push(c),
		}
	}
	out
}

/// Standalone HTML page wrapping the given body
pub fn html_page(title: &str, body: &str) -> String {
	let title = escape_html(title);
	format!(
		"<!DOCTYPE html>\n<html>\n<head>\n<title>{title}</title>\n<style>\ntable, th, td {{\n    border: 1px solid black;\n}}\n</style>\n</head>\n<body>\n{body}</body>\n</html>\n"
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Table {
		let mut table = Table::new(["module", "cpu"]);
		table.push(["dpm", "1.5"]);
		table.push(["mmm, be", "2"]);
		table
	}

	#[test]
	fn test_render_template() {
		let out = render(
			"{{range .items}}{{.name}}={{.value}};{{end}}",
			&json!({"items": [{"name": "a", "value": 1}, {"name": "b", "value": "x"}]}),
		)
		.unwrap();
		assert_eq!(out, "a=1;b=x;");
	}

	#[test]
	fn test_table_html() {
		let html = sample().to_html().unwrap();
		assert!(html.contains("<tr><th>module</th><th>cpu</th></tr>"));
		assert!(html.contains("<tr><td>dpm</td><td>1.5</td></tr>"));
	}

	#[test]
	fn test_table_html_escapes_cells() {
		let mut table = Table::new(["option", "value"]);
		table.push(["javaOpts", "-Xmx<heap> && \"quoted\""]);
		let html = table.to_html().unwrap();
		assert!(html.contains("<td>-Xmx&lt;heap&gt; &amp;&amp; &quot;quoted&quot;</td>"), "{html}");
		assert!(!html.contains("<heap>"));
		assert!(html_page("a<b", "").contains("<title>a&lt;b</title>"));
	}

	#[test]
	fn test_csv_quotes_and_parses_back() {
		let csv = sample().to_csv();
		assert_eq!(csv, "module,cpu\ndpm,1.5\n\"mmm, be\",2\n");
		assert_eq!(parse_csv(&csv), sample());
	}

	#[test]
	fn test_parse_csv_keeps_empty_cells() {
		let table = parse_csv("a,b,c\n1,,3\n");
		assert_eq!(table.rows, vec![vec!["1".to_string(), String::new(), "3".to_string()]]);
	}

	#[test]
	fn test_fmt_number() {
		assert_eq!(fmt_number(1_073_741_824.0), "1073741824");
		assert_eq!(fmt_number(0.5), "0.5");
		assert_eq!(fmt_number(-2.0), "-2");
	}

	#[test]
	fn test_write_text_aligns_columns() {
		let mut out = Vec::new();
		sample().write_text(&mut out).unwrap();
		let text = String::from_utf8(out).unwrap();
		assert_eq!(text, "module   cpu\ndpm      1.5\nmmm, be  2\n");
	}
}

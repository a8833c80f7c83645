//! Model Summary
//!
//! A table of layers with their output shapes and parameter counts, printed
//! the way deep-learning frameworks print a model summary:
//!
//! ```text
//! Model: "transformer"
//! ______________________________________________________________________
//!  Layer (type)                        Output Shape           Param #
//! ======================================================================
//!  encoder_embedding (Embedding)       (2, 7, 512)           512,000
//!  ...
//! ======================================================================
//! Total params: 44,302,512
//! ```

use std::fmt;

const WIDTH: usize = 70;

/// One line of the summary table
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRow {
    pub name: String,
    pub layer_type: &'static str,
    pub output_shape: Vec<usize>,
    pub params: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelSummary {
    pub model_name: String,
    pub rows: Vec<SummaryRow>,
}

impl ModelSummary {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        name: impl Into<String>,
        layer_type: &'static str,
        output_shape: Vec<usize>,
        params: usize,
    ) {
        self.rows.push(SummaryRow {
            name: name.into(),
            layer_type,
            output_shape,
            params,
        });
    }

    /// Sum of the parameter column
    pub fn total_params(&self) -> usize {
        self.rows.iter().map(|r| r.params).sum()
    }
}

/// `(2, 7, 512)`
fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(usize::to_string).collect();
    format!("({})", dims.join(", "))
}

/// `44302512` → `44,302,512`
fn with_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: \"{}\"", self.model_name)?;
        writeln!(f, "{}", "_".repeat(WIDTH))?;
        writeln!(f, " {:<35} {:<22} {:>10}", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(f, "{}", "=".repeat(WIDTH))?;
        for row in &self.rows {
            let label = format!("{} ({})", row.name, row.layer_type);
            writeln!(
                f,
                " {:<35} {:<22} {:>10}",
                label,
                format_shape(&row.output_shape),
                with_thousands(row.params)
            )?;
        }
        writeln!(f, "{}", "=".repeat(WIDTH))?;
        write!(f, "Total params: {}", with_thousands(self.total_params()))
    }
}

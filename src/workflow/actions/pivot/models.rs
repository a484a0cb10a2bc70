use serde::{Deserialize, Serialize};

/// Aggregation applied to the values falling into one pivot cell
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AggFunc {
    #[default]
    Mean,
    Sum,
    Count,
    Min,
    Max,
}

impl AggFunc {
    pub const ALL: [&'static str; 5] = ["mean", "sum", "count", "min", "max"];

    pub fn is_numeric(&self) -> bool {
        !matches!(self, AggFunc::Count)
    }
}

/// Running aggregate of one cell.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    count: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    pub fn push(
        &mut self,
        value: f64,
    ) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn push_count(&mut self) {
        self.count += 1;
    }

    /// `None` when nothing was pushed.
    pub fn finish(
        &self,
        func: AggFunc,
    ) -> Option<String> {
        if self.count == 0 {
            return None;
        }
        let v = match func {
            AggFunc::Count => return Some(self.count.to_string()),
            AggFunc::Mean => self.sum / self.count as f64,
            AggFunc::Sum => self.sum,
            AggFunc::Min => self.min?,
            AggFunc::Max => self.max?,
        };
        Some(v.to_string())
    }
}

use serde::{Deserialize, Serialize};

/// Comparison applied between a cell and the filter value
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterOperator {
    #[default]
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    // for string
    Contains,
}

impl FilterOperator {
    pub const ALL: [&'static str; 7] = ["eq", "ne", "gt", "ge", "lt", "le", "contains"];

    /// Numeric comparison when both sides parse as numbers, string comparison otherwise.
    pub fn matches(
        &self,
        cell: &str,
        value: &str,
    ) -> bool {
        if let FilterOperator::Contains = self {
            return cell.contains(value);
        }

        let ordering = match (cell.trim().parse::<f64>(), value.trim().parse::<f64>()) {
            (Ok(a), Ok(b)) => match a.partial_cmp(&b) {
                Some(o) => o,
                None => return false,
            },
            _ => cell.cmp(value),
        };

        match self {
            FilterOperator::Eq => ordering.is_eq(),
            FilterOperator::Ne => ordering.is_ne(),
            FilterOperator::Gt => ordering.is_gt(),
            FilterOperator::Ge => ordering.is_ge(),
            FilterOperator::Lt => ordering.is_lt(),
            FilterOperator::Le => ordering.is_le(),
            FilterOperator::Contains => false,
        }
    }
}

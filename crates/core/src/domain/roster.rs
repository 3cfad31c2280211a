use crate::domain::hero::HeroId;
use crate::error::CounterError;
use serde_json::Value;

/// Hero ids submitted as one side of a match, in caller order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster(Vec<HeroId>);

impl Roster {
    pub fn new(ids: Vec<HeroId>) -> Self {
        Self(ids)
    }

    /// Parse a JSON roster field. A missing field (`None` or `null`) is an empty roster.
    pub fn from_json(field: &str, value: Option<&Value>) -> Result<Self, CounterError> {
        let items = match value {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(CounterError::InvalidInput(format!(
                    "{field} must be an array of hero ids (got {})",
                    json_type(other)
                )))
            }
        };

        let mut ids = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let id = item
                .as_i64()
                .and_then(|n| HeroId::try_from(n).ok())
                .ok_or_else(|| {
                    CounterError::InvalidInput(format!(
                        "{field}[{idx}] must be an integer hero id (got {item})"
                    ))
                })?;
            ids.push(id);
        }

        Ok(Self(ids))
    }

    /// Parse a comma-separated id list such as `1,2, 7`.
    pub fn parse_list(s: &str) -> Result<Self, CounterError> {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<HeroId>().map_err(|_| {
                    CounterError::InvalidInput(format!("{p:?} is not an integer hero id"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Ids with repeats removed, keeping first-occurrence order.
    pub fn distinct(&self) -> Vec<HeroId> {
        let mut seen = std::collections::HashSet::with_capacity(self.0.len());
        self.0.iter().copied().filter(|id| seen.insert(*id)).collect()
    }

    pub fn ids(&self) -> &[HeroId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<HeroId>> for Roster {
    fn from(ids: Vec<HeroId>) -> Self {
        Self(ids)
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

use std::fmt;

/// The wire formats the pipeline can write.
#[derive(Copy, Clone, Debug, Eq, PartialEq, derivative::Derivative)]
#[derivative(Default)]
pub enum Format {
    /// One JSON array of `{"id": .., "text": ..}` objects.
    #[derivative(Default)]
    Json,

    /// A header line of `id,text`, then one line per record.
    Csv,
}

impl Format {
    /// Pick a format from a request parameter.
    ///
    /// Only `csv` selects CSV.  Anything else, including no parameter at all, gets JSON.
    pub fn from_param(param: Option<&str>) -> Format {
        match param {
            Some("csv") => Format::Csv,
            _ => Format::Json,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Csv => "text/csv",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Format, Self::Err> {
        Ok(Format::from_param(Some(s)))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_csv_selects_csv() {
        assert_eq!(Format::from_param(Some("csv")), Format::Csv);
        assert_eq!(Format::from_param(Some("json")), Format::Json);
        assert_eq!(Format::from_param(Some("CSV")), Format::Json);
        assert_eq!(Format::from_param(Some("xml")), Format::Json);
        assert_eq!(Format::from_param(None), Format::Json);
        assert_eq!(Format::default(), Format::Json);
        assert_eq!("csv".parse::<Format>().unwrap(), Format::Csv);
    }

    #[test]
    fn content_types() {
        assert_eq!(Format::Json.content_type(), "application/json");
        assert_eq!(Format::Csv.content_type(), "text/csv");
    }
}

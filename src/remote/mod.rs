//! The request channel to the budget server
//!
//! Everything the client sends goes through [`Connection::dorequest`], which
//! takes an operation name and a JSON payload and returns the JSON response.
//! Transport, authentication and retries belong to the implementor.

pub mod memory;

pub use memory::MemoryServer;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NynabError, NynabResult};
use crate::models::{CurrencyFormat, DateFormat};

/// Operation names understood by the server
pub mod opname {
    pub const SYNC_CATALOG_DATA: &str = "syncCatalogData";
    pub const SYNC_BUDGET_DATA: &str = "syncBudgetData";
    pub const CREATE_NEW_BUDGET: &str = "CreateNewBudget";
}

/// An authenticated channel to the budget server
pub trait Connection {
    /// Send one request and return the server's response body
    fn dorequest(&mut self, opname: &str, request: Value) -> NynabResult<Value>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn dorequest(&mut self, opname: &str, request: Value) -> NynabResult<Value> {
        (**self).dorequest(opname, request)
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn dorequest(&mut self, opname: &str, request: Value) -> NynabResult<Value> {
        (**self).dorequest(opname, request)
    }
}

/// Send a typed request and decode the typed response
pub(crate) fn call<C, Req, Resp>(
    connection: &mut C,
    opname: &str,
    request: &Req,
) -> NynabResult<Resp>
where
    C: Connection + ?Sized,
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_value(request)?;
    let response = connection.dorequest(opname, payload)?;
    serde_json::from_value(response)
        .map_err(|e| NynabError::remote(opname, format!("malformed response: {}", e)))
}

/// Payload of `CreateNewBudget`
///
/// The formats travel as JSON-encoded strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBudgetRequest {
    pub budget_name: String,
    pub currency_format: String,
    pub date_format: String,
}

impl CreateBudgetRequest {
    /// Request a budget with the default USD and MM/DD/YYYY formats
    pub fn new(budget_name: impl Into<String>) -> NynabResult<Self> {
        Self::with_formats(budget_name, &CurrencyFormat::default(), &DateFormat::default())
    }

    pub fn with_formats(
        budget_name: impl Into<String>,
        currency_format: &CurrencyFormat,
        date_format: &DateFormat,
    ) -> NynabResult<Self> {
        let budget_name = budget_name.into();
        if budget_name.trim().is_empty() {
            return Err(NynabError::Validation("Budget name cannot be empty".into()));
        }
        Ok(Self {
            budget_name,
            currency_format: serde_json::to_string(currency_format)?,
            date_format: serde_json::to_string(date_format)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo {
        seen: Vec<String>,
    }

    impl Connection for Echo {
        fn dorequest(&mut self, opname: &str, request: Value) -> NynabResult<Value> {
            self.seen.push(opname.to_string());
            Ok(request)
        }
    }

    #[test]
    fn test_call_round_trips_through_connection() {
        let mut echo = Echo { seen: Vec::new() };
        let request = CreateBudgetRequest::new("Household").unwrap();
        let response: CreateBudgetRequest =
            call(&mut echo, opname::CREATE_NEW_BUDGET, &request).unwrap();

        assert_eq!(response, request);
        assert_eq!(echo.seen, vec!["CreateNewBudget"]);
    }

    #[test]
    fn test_connection_through_mut_ref_and_box() {
        let mut echo = Echo { seen: Vec::new() };
        {
            let mut by_ref = &mut echo;
            by_ref.dorequest("a", json!({})).unwrap();
        }
        let mut boxed: Box<dyn Connection> = Box::new(echo);
        assert_eq!(boxed.dorequest("b", json!(1)).unwrap(), json!(1));
    }

    #[test]
    fn test_malformed_response_is_remote_error() {
        let mut echo = Echo { seen: Vec::new() };
        let result: NynabResult<CreateBudgetRequest> =
            call(&mut echo, opname::SYNC_BUDGET_DATA, &json!({"unexpected": true}));
        assert!(result.unwrap_err().is_remote());
    }

    #[test]
    fn test_create_budget_payload_encodes_formats_as_strings() {
        let request = CreateBudgetRequest::new("Household").unwrap();
        let currency: Value = serde_json::from_str(&request.currency_format).unwrap();
        assert_eq!(currency["iso_code"], "USD");
        assert_eq!(currency["currency_symbol"], "$");
        assert_eq!(request.date_format, r#"{"format":"MM/DD/YYYY"}"#);
        assert!(CreateBudgetRequest::new("  ").unwrap_err().is_validation());
    }
}

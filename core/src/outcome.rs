//! The result of handling one response.

use crate::fault::ApiFault;

/// Either a typed result, a fault, or (for void calls) neither.
///
/// The two slots are never populated at the same time: `Outcome::new`
/// drops the result when a fault is given.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    result: Option<T>,
    fault: Option<ApiFault>,
}

impl<T> Outcome<T> {
    pub fn new(result: Option<T>, fault: Option<ApiFault>) -> Self {
        match fault {
            Some(fault) => Self::failure(fault),
            None => Self {
                result,
                fault: None,
            },
        }
    }

    pub fn success(result: T) -> Self {
        Self {
            result: Some(result),
            fault: None,
        }
    }

    /// A successful outcome for a call that returns nothing.
    pub fn empty() -> Self {
        Self {
            result: None,
            fault: None,
        }
    }

    pub fn failure(fault: ApiFault) -> Self {
        Self {
            result: None,
            fault: Some(fault),
        }
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn fault(&self) -> Option<&ApiFault> {
        self.fault.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.fault.is_none()
    }

    pub fn into_result(self) -> Result<Option<T>, ApiFault> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(self.result),
        }
    }
}

use crate::models;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

#[derive(Serialize, Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LimitsForm {
    #[validate(minimum = 0)]
    pub standard_limit: i64,
    #[validate(minimum = 0)]
    pub premium_limit: i64,
}

impl Into<models::UsageLimits> for LimitsForm {
    fn into(self) -> models::UsageLimits {
        models::UsageLimits {
            standard_limit: self.standard_limit,
            premium_limit: self.premium_limit,
        }
    }
}

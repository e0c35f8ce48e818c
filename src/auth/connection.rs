//! Connection identifiers linking this site to a FarmLab account and farm.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, FarmId},
};

/// Account and farm identifiers stored after the connect flows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
	/// Set once the authorization flow resolves the user's account.
	pub account_id: Option<AccountId>,
	/// Set once a farm is created or selected.
	pub farm_id: Option<FarmId>,
}
impl Connection {
	/// Returns the account id or a [`Error::NotConnected`] failure.
	pub fn require_account(&self) -> Result<AccountId> {
		self.account_id.ok_or(Error::NotConnected { missing: "account" })
	}

	/// Returns the farm id or a [`Error::NotConnected`] failure.
	pub fn require_farm(&self) -> Result<FarmId> {
		self.farm_id.ok_or(Error::NotConnected { missing: "farm" })
	}
}

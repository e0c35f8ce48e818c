//! Connect flows: account discovery, farm creation and selection, boundary creation.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, BoundaryId, Connection, FarmId},
	client::{Account, ApiClient, Farm, FarmRef, NewBoundary, NewFarm, RequestOptions},
	envelope::OneOrMany,
	error::ApiError,
	http::{HttpTransport, Method},
	manager::TokenState,
	obs::{self, OperationKind},
};

/// Snapshot returned by [`ApiClient::connection_status`].
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionStatus {
	/// Stored identifiers.
	pub connection: Connection,
	/// Connected account, when one is stored and reachable.
	pub account: Option<Account>,
	/// Selected farm, when one is stored and reachable.
	pub farm: Option<Farm>,
	/// Token state after re-inspecting the store.
	pub token_state: TokenState,
}

impl<C> ApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Completes the authorization callback, then resolves and stores the user's account.
	///
	/// `GET Account` is retried once when it fails with an API error, since FarmLab can lag
	/// behind a freshly issued token.
	pub async fn connect(&self, code: &str, state: Option<&str>) -> Result<AccountId> {
		self.manager.complete_authorization(code, state).await?;

		let accounts = match self.fetch_accounts().await {
			Err(Error::Api(e)) => {
				obs::warn_absorbed(OperationKind::ApiRequest, "connect", &e);

				self.fetch_accounts().await?
			},
			result => result?,
		};
		let account_id = accounts
			.first()
			.map(|account| account.id)
			.ok_or(ApiError::MissingPayload { operation: "GET Account", status: 200 })?;

		self.store.save_account_id(account_id).await?;

		Ok(account_id)
	}

	/// Lists the accounts visible to the token (`GET Account`).
	pub async fn fetch_accounts(&self) -> Result<Vec<Account>> {
		let accounts: OneOrMany<Account> =
			self.fetch_payload("GET Account", Method::Get, "Account", RequestOptions::default())
				.await?;

		Ok(accounts.into_vec())
	}

	/// Lists the farms visible to the token (`GET Farm`).
	pub async fn list_farms(&self) -> Result<Vec<Farm>> {
		let farms: OneOrMany<Farm> =
			self.fetch_payload("GET Farm", Method::Get, "Farm", RequestOptions::default()).await?;

		Ok(farms.into_vec())
	}

	/// Creates a farm under the connected account and selects it.
	pub async fn create_farm(&self, farm: NewFarm) -> Result<FarmId> {
		let connection = self.store.fetch_connection().await?;
		let account_id = connection.require_account()?;

		if let Some(farm_id) = connection.farm_id {
			return Err(Error::FarmAlreadySelected { farm_id });
		}

		let body = serde_json::json!({
			"account": { "id": account_id },
			"type": "Farm",
			"dormant": true,
			"name": farm.name,
			"ownerEmail": farm.owner_email,
			"ownerName": farm.owner_name,
			"ownerPhone": farm.owner_phone,
		});
		let created: OneOrMany<FarmRef> = self
			.fetch_payload("POST Farm", Method::Post, "Farm", RequestOptions::default().json(body))
			.await?;
		let farm_id = created
			.into_first()
			.map(|farm| farm.id)
			.ok_or(ApiError::MissingPayload { operation: "POST Farm", status: 200 })?;

		self.store.save_farm_id(farm_id).await?;

		Ok(farm_id)
	}

	/// Selects an existing farm. Fails if another farm is already selected.
	pub async fn select_farm(&self, farm_id: FarmId) -> Result<()> {
		let connection = self.store.fetch_connection().await?;

		connection.require_account()?;

		if let Some(selected) = connection.farm_id {
			return Err(Error::FarmAlreadySelected { farm_id: selected });
		}

		self.store.save_farm_id(farm_id).await?;

		Ok(())
	}

	/// Creates a boundary under the selected farm (`POST Paddock`).
	///
	/// Returns the new id when FarmLab echoes one back.
	pub async fn create_boundary(&self, boundary: NewBoundary) -> Result<Option<BoundaryId>> {
		#[derive(Deserialize)]
		struct Created {
			id: BoundaryId,
		}

		let farm_id = self.store.fetch_connection().await?.require_farm()?;
		let created: OneOrMany<serde_json::Value> = self
			.fetch_payload(
				"POST Paddock",
				Method::Post,
				"Paddock",
				RequestOptions::default().json(boundary.into_payload(farm_id)),
			)
			.await?;

		Ok(created
			.into_first()
			.and_then(|value| serde_json::from_value::<Created>(value).ok())
			.map(|created| created.id))
	}

	/// Reports the stored identifiers, the records they point at, and the token state.
	pub async fn connection_status(&self) -> Result<ConnectionStatus> {
		let connection = self.store.fetch_connection().await?;
		let token_state = self.manager.inspect_state().await?;
		let account = match connection.account_id {
			Some(_) => self.get_account().await,
			None => None,
		};
		let farm = match connection.farm_id {
			Some(_) => self.get_farm().await,
			None => None,
		};

		Ok(ConnectionStatus { connection, account, farm, token_state })
	}

	/// Forgets the token, connection identifiers, and any pending authorization.
	pub async fn revoke(&self) -> Result<()> {
		self.manager.revoke().await
	}
}

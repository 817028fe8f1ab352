//! Client and contract registry service

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditService;
use shared::models::{AuditAction, Client, Contract};
use shared::validation::{validate_email, validate_required};

/// Client registry service
#[derive(Clone)]
pub struct ClientService {
    db: PgPool,
}

/// Input for creating a client
#[derive(Debug, Deserialize)]
pub struct CreateClientInput {
    pub company_name: String,
    pub contact_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Defaults to the creating manager
    pub manager_id: Option<Uuid>,
}

/// Input for updating a client
#[derive(Debug, Deserialize)]
pub struct UpdateClientInput {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub manager_id: Option<Uuid>,
}

/// Input for creating a contract under a client
#[derive(Debug, Deserialize)]
pub struct CreateContractInput {
    pub number: String,
    pub signed_at: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Row for client queries
#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: Uuid,
    company_name: String,
    contact_name: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    manager_id: Uuid,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClientRow {
    fn into_client(self) -> Client {
        Client {
            id: self.id,
            company_name: self.company_name,
            contact_name: self.contact_name,
            phone: self.phone,
            email: self.email,
            address: self.address,
            manager_id: self.manager_id,
            is_archived: self.is_archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Row for contract queries
#[derive(Debug, sqlx::FromRow)]
struct ContractRow {
    id: Uuid,
    client_id: Uuid,
    number: String,
    signed_at: NaiveDate,
    valid_until: Option<NaiveDate>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl ContractRow {
    fn into_contract(self) -> Contract {
        Contract {
            id: self.id,
            client_id: self.client_id,
            number: self.number,
            signed_at: self.signed_at,
            valid_until: self.valid_until,
            note: self.note,
            created_at: self.created_at,
        }
    }
}

const CLIENT_COLUMNS: &str = "id, company_name, contact_name, phone, email, address, manager_id, is_archived, created_at, updated_at";

impl ClientService {
    /// Create a new ClientService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a client company
    pub async fn create_client(
        &self,
        user_id: Uuid,
        input: CreateClientInput,
    ) -> AppResult<Client> {
        validate_required(&input.company_name)
            .map_err(|msg| AppError::validation("company_name", msg))?;
        validate_required(&input.contact_name)
            .map_err(|msg| AppError::validation("contact_name", msg))?;
        if let Some(email) = &input.email {
            validate_email(email).map_err(|msg| AppError::validation("email", msg))?;
        }

        let manager_id = input.manager_id.unwrap_or(user_id);

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ClientRow>(&format!(
            r#"
            INSERT INTO clients (company_name, contact_name, phone, email, address, manager_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&input.company_name)
        .bind(&input.contact_name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(manager_id)
        .fetch_one(&mut *tx)
        .await?;

        let client = row.into_client();

        AuditService::record(
            &mut tx,
            user_id,
            AuditAction::Create,
            "client",
            client.id,
            None,
            Some(serde_json::json!({ "company_name": client.company_name })),
        )
        .await?;

        tx.commit().await?;

        Ok(client)
    }

    /// Update client fields
    pub async fn update_client(
        &self,
        user_id: Uuid,
        client_id: Uuid,
        input: UpdateClientInput,
    ) -> AppResult<Client> {
        if let Some(name) = &input.company_name {
            validate_required(name).map_err(|msg| AppError::validation("company_name", msg))?;
        }
        if let Some(email) = &input.email {
            validate_email(email).map_err(|msg| AppError::validation("email", msg))?;
        }

        let before = self.get_client(client_id).await?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ClientRow>(&format!(
            r#"
            UPDATE clients
            SET company_name = COALESCE($1, company_name),
                contact_name = COALESCE($2, contact_name),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email),
                address = COALESCE($5, address),
                manager_id = COALESCE($6, manager_id),
                updated_at = NOW()
            WHERE id = $7
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&input.company_name)
        .bind(&input.contact_name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(input.manager_id)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

        let client = row.into_client();

        AuditService::record(
            &mut tx,
            user_id,
            AuditAction::Update,
            "client",
            client.id,
            Some(serde_json::to_value(&before).unwrap_or_default()),
            Some(serde_json::to_value(&client).unwrap_or_default()),
        )
        .await?;

        tx.commit().await?;

        Ok(client)
    }

    /// Archive a client; archived clients take no new deals
    pub async fn archive_client(&self, user_id: Uuid, client_id: Uuid) -> AppResult<Client> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ClientRow>(&format!(
            r#"
            UPDATE clients
            SET is_archived = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

        let client = row.into_client();

        AuditService::record(
            &mut tx,
            user_id,
            AuditAction::Archive,
            "client",
            client.id,
            None,
            Some(serde_json::json!({ "is_archived": true })),
        )
        .await?;

        tx.commit().await?;

        Ok(client)
    }

    /// Get a client by ID
    pub async fn get_client(&self, client_id: Uuid) -> AppResult<Client> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

        Ok(row.into_client())
    }

    /// List clients, optionally including archived ones
    pub async fn list_clients(&self, include_archived: bool) -> AppResult<Vec<Client>> {
        let rows = if include_archived {
            sqlx::query_as::<_, ClientRow>(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY company_name ASC"
            ))
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, ClientRow>(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients WHERE is_archived = FALSE ORDER BY company_name ASC"
            ))
            .fetch_all(&self.db)
            .await?
        };

        Ok(rows.into_iter().map(ClientRow::into_client).collect())
    }

    /// Create a framework contract under a client
    pub async fn create_contract(
        &self,
        user_id: Uuid,
        client_id: Uuid,
        input: CreateContractInput,
    ) -> AppResult<Contract> {
        validate_required(&input.number).map_err(|msg| AppError::validation("number", msg))?;

        let client = self.get_client(client_id).await?;
        if client.is_archived {
            return Err(AppError::Conflict {
                resource: "client".to_string(),
                message: "Cannot add a contract to an archived client".to_string(),
            });
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM contracts WHERE number = $1)",
        )
        .bind(&input.number)
        .fetch_one(&self.db)
        .await?;
        if duplicate {
            return Err(AppError::DuplicateEntry("number".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ContractRow>(
            r#"
            INSERT INTO contracts (client_id, number, signed_at, valid_until, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, client_id, number, signed_at, valid_until, note, created_at
            "#,
        )
        .bind(client_id)
        .bind(&input.number)
        .bind(input.signed_at)
        .bind(input.valid_until)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        let contract = row.into_contract();

        AuditService::record(
            &mut tx,
            user_id,
            AuditAction::Create,
            "contract",
            contract.id,
            None,
            Some(serde_json::json!({ "client_id": client_id, "number": contract.number })),
        )
        .await?;

        tx.commit().await?;

        Ok(contract)
    }

    /// List a client's contracts
    pub async fn list_contracts(&self, client_id: Uuid) -> AppResult<Vec<Contract>> {
        // ensure the client exists so a bad id is a 404, not an empty list
        self.get_client(client_id).await?;

        let rows = sqlx::query_as::<_, ContractRow>(
            r#"
            SELECT id, client_id, number, signed_at, valid_until, note, created_at
            FROM contracts
            WHERE client_id = $1
            ORDER BY signed_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ContractRow::into_contract).collect())
    }
}

//! # Company Repository
//!
//! One company per employer, globally unique names. Callers run the
//! existence checks and the insert inside one transaction; the unique
//! indexes on `owner_id` and `company_name` backstop concurrent creates.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::Company;
use crate::models::company::{ActiveModel as CompanyActiveModel, Column, Model as CompanyModel};

/// Validated data for a new company
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub company_name: String,
    pub company_location: String,
    pub description: String,
}

/// Repository for company registry operations
pub struct CompanyRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CompanyRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<CompanyModel>, RepositoryError> {
        Company::find()
            .filter(Column::OwnerId.eq(owner_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn name_taken(&self, company_name: &str) -> Result<bool, RepositoryError> {
        let found = Company::find()
            .filter(Column::CompanyName.eq(company_name))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(found.is_some())
    }

    /// Insert a company for `owner_id`.
    pub async fn create(
        &self,
        owner_id: Uuid,
        company: NewCompany,
    ) -> Result<CompanyModel, RepositoryError> {
        let model = CompanyActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            company_name: Set(company.company_name),
            company_location: Set(company.company_location),
            description: Set(company.description),
            created_at: Set(Utc::now().into()),
        };

        model.insert(self.db).await.map_err(|err| {
            let err = RepositoryError::database_error(err);
            if err.is_unique_violation() {
                RepositoryError::conflict("Company already exists.")
            } else {
                err
            }
        })
    }
}

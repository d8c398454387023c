//! Beneficiary Handler
//!
//! CRUD, name search and image attachment for beneficiaries.

use std::sync::Arc;

use validator::Validate;

use crate::domain::{
    detect_image_type, is_image, Beneficiary, BeneficiaryDraft, DomainError, OperationContext,
};
use crate::messages::Messages;
use crate::store::{BeneficiaryStore, StoreError};

use super::commands::{first_violation, BENEFICIARY_RULES};
use super::{bad_input, not_found, resolve_id, BeneficiaryCommand};

#[derive(Clone)]
pub struct BeneficiaryHandler {
    store: Arc<dyn BeneficiaryStore>,
    messages: Messages,
}

impl BeneficiaryHandler {
    pub fn new(store: Arc<dyn BeneficiaryStore>, messages: Messages) -> Self {
        Self { store, messages }
    }

    fn id(&self, text: &str, ctx: &OperationContext) -> Result<i64, DomainError> {
        resolve_id(&self.messages, ctx, text, "beneficiary.invalid_id")
    }

    fn not_found(&self, id: i64, ctx: &OperationContext) -> DomainError {
        not_found(&self.messages, ctx, "beneficiary.not_found", id)
    }

    fn draft(
        &self,
        command: BeneficiaryCommand,
        ctx: &OperationContext,
    ) -> Result<BeneficiaryDraft, DomainError> {
        if let Err(errors) = command.validate() {
            let code = first_violation(&errors, BENEFICIARY_RULES)
                .unwrap_or("beneficiary.phone.pattern");
            return Err(bad_input(&self.messages, ctx, code, &[]));
        }

        Ok(BeneficiaryDraft {
            name: command.name,
            phone: command.phone,
            note: command.note,
        })
    }

    /// Load an existing beneficiary by numeric id
    pub async fn find(&self, id: i64, ctx: &OperationContext) -> Result<Beneficiary, DomainError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id, ctx))
    }

    pub async fn insert(
        &self,
        command: BeneficiaryCommand,
        ctx: &OperationContext,
    ) -> Result<Beneficiary, DomainError> {
        let draft = self.draft(command, ctx)?;
        let beneficiary = self.store.insert(draft).await?;

        tracing::info!(
            beneficiary_id = beneficiary.id,
            correlation_id = ?ctx.correlation_id,
            "Beneficiary created"
        );
        Ok(beneficiary)
    }

    pub async fn update(
        &self,
        id: &str,
        command: BeneficiaryCommand,
        ctx: &OperationContext,
    ) -> Result<Beneficiary, DomainError> {
        let id = self.id(id, ctx)?;
        let draft = self.draft(command, ctx)?;

        let mut beneficiary = self.find(id, ctx).await?;
        beneficiary.apply(draft);

        match self.store.update(beneficiary).await {
            Ok(updated) => {
                tracing::info!(beneficiary_id = id, correlation_id = ?ctx.correlation_id, "Beneficiary updated");
                Ok(updated)
            }
            Err(StoreError::RowNotFound(_)) => Err(self.not_found(id, ctx)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove(&self, id: &str, ctx: &OperationContext) -> Result<(), DomainError> {
        let id = self.id(id, ctx)?;
        self.find(id, ctx).await?;

        match self.store.delete(id).await {
            Ok(()) => {
                tracing::info!(beneficiary_id = id, correlation_id = ?ctx.correlation_id, "Beneficiary deleted");
                Ok(())
            }
            Err(StoreError::RowNotFound(_)) => Err(self.not_found(id, ctx)),
            Err(e) if e.is_foreign_key_violation() => Err(bad_input(
                &self.messages,
                ctx,
                "beneficiary.has_dependents",
                &[&id],
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(
        &self,
        id: &str,
        ctx: &OperationContext,
    ) -> Result<Beneficiary, DomainError> {
        let id = self.id(id, ctx)?;
        self.find(id, ctx).await
    }

    pub async fn list_all(&self, _ctx: &OperationContext) -> Result<Vec<Beneficiary>, DomainError> {
        Ok(self.store.find_all().await?)
    }

    /// Case-insensitive substring search on the name
    pub async fn search_by_name(
        &self,
        fragment: &str,
        _ctx: &OperationContext,
    ) -> Result<Vec<Beneficiary>, DomainError> {
        Ok(self.store.search_by_name(fragment).await?)
    }

    /// Store `bytes` as the beneficiary's image when the content sniffs as one
    pub async fn attach_image(
        &self,
        id: &str,
        bytes: Vec<u8>,
        ctx: &OperationContext,
    ) -> Result<(), DomainError> {
        let id = self.id(id, ctx)?;
        self.find(id, ctx).await?;

        if !is_image(&bytes) {
            return Err(bad_input(&self.messages, ctx, "beneficiary.not_an_image", &[]));
        }

        let size = bytes.len();
        match self.store.save_image(id, bytes).await {
            Ok(()) => {
                tracing::info!(
                    beneficiary_id = id,
                    size,
                    correlation_id = ?ctx.correlation_id,
                    "Beneficiary image stored"
                );
                Ok(())
            }
            Err(StoreError::RowNotFound(_)) => Err(self.not_found(id, ctx)),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored image bytes and their detected media type
    pub async fn image(
        &self,
        id: &str,
        ctx: &OperationContext,
    ) -> Result<(Vec<u8>, &'static str), DomainError> {
        let id = self.id(id, ctx)?;
        self.find(id, ctx).await?;

        let image = self.store.load_image(id).await?;
        image
            .map(|bytes| {
                let media_type = detect_image_type(&bytes).unwrap_or("application/octet-stream");
                (bytes, media_type)
            })
            .ok_or_else(|| not_found(&self.messages, ctx, "beneficiary.image_not_found", id))
    }
}

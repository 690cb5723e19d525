//! Evaluation templates and submissions.
//!
//! Templates are authored with a [`FormBuilder`], validated locally, and
//! only then sent. Submissions are checked against their template the same
//! way, so a malformed answer never reaches the network.

use std::sync::Arc;

use lockerroom_cache::{CacheRead, QueryClient, QueryOptions, Subscription};
use lockerroom_core::{
    EvaluationId, EvaluationSubmission, EvaluationTemplate, LockerRoomApi, LockerRoomError,
    LockerRoomResult, NewEvaluation, TemplateId,
};
use lockerroom_forms::{locate, validate_answers, FieldLocation, FormBuilder};

use super::from_api;
use crate::keys;

#[derive(Clone)]
pub struct EvaluationService {
    api: Arc<dyn LockerRoomApi>,
    client: QueryClient,
}

impl EvaluationService {
    pub fn new(api: Arc<dyn LockerRoomApi>, client: QueryClient) -> Self {
        Self { api, client }
    }

    fn options(&self) -> QueryOptions {
        self.client.config().query_options()
    }

    // ------------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------------

    pub async fn templates(&self) -> LockerRoomResult<Vec<EvaluationTemplate>> {
        self.client
            .fetch_query(
                keys::templates(),
                self.options(),
                from_api(&self.api, |api| async move { api.templates().await }),
            )
            .await
            .map(CacheRead::into_value)
    }

    pub fn watch_templates(&self) -> Subscription<Vec<EvaluationTemplate>> {
        self.client.subscribe(
            keys::templates(),
            self.options(),
            from_api(&self.api, |api| async move { api.templates().await }),
        )
    }

    pub async fn template(&self, template_id: TemplateId) -> LockerRoomResult<EvaluationTemplate> {
        self.client
            .fetch_query(
                keys::template(template_id),
                self.options(),
                from_api(&self.api, move |api| async move {
                    api.template(template_id).await
                }),
            )
            .await
            .map(CacheRead::into_value)
    }

    /// Open an existing template for editing.
    pub async fn builder_for(&self, template_id: TemplateId) -> LockerRoomResult<FormBuilder> {
        let template = self.template(template_id).await?;
        Ok(FormBuilder::from_template(&template))
    }

    /// Create (`template_id == None`) or replace a template. The builder is
    /// validated first; nothing is sent if it has problems.
    pub async fn save_template(
        &self,
        template_id: Option<TemplateId>,
        builder: &FormBuilder,
    ) -> LockerRoomResult<EvaluationTemplate> {
        let draft = builder.to_draft().map_err(LockerRoomError::from)?;

        let mutation = self
            .client
            .mutation::<EvaluationTemplate>("save_template")
            .reconcile_with::<Vec<EvaluationTemplate>, _>(keys::templates(), |before, saved| {
                before.map(|templates| upsert(templates, saved))
            });

        let saved = match template_id {
            Some(id) => {
                mutation
                    .reconcile::<EvaluationTemplate, _>(keys::template(id), |saved| {
                        Some(saved.clone())
                    })
                    .execute(self.api.update_template(id, &draft))
                    .await?
            }
            None => {
                let saved = mutation.execute(self.api.create_template(&draft)).await?;
                self.client
                    .set_query_data(keys::template(saved.id), saved.clone());
                saved
            }
        };

        tracing::info!(
            template_id = %saved.id,
            fields = saved.fields.len(),
            "Saved evaluation template"
        );
        Ok(saved)
    }

    pub async fn delete_template(&self, template_id: TemplateId) -> LockerRoomResult<()> {
        self.client
            .mutation::<()>("delete_template")
            .optimistic::<Vec<EvaluationTemplate>, _>(keys::templates(), move |templates| {
                templates.map(|templates| {
                    templates
                        .iter()
                        .filter(|t| t.id != template_id)
                        .cloned()
                        .collect()
                })
            })
            .execute(self.api.delete_template(template_id))
            .await?;
        self.client.remove_query(&keys::template(template_id));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Submissions
    // ------------------------------------------------------------------------

    pub async fn my_evaluations(&self) -> LockerRoomResult<Vec<EvaluationSubmission>> {
        self.client
            .fetch_query(
                keys::my_evaluations(),
                self.options(),
                from_api(&self.api, |api| async move { api.my_evaluations().await }),
            )
            .await
            .map(CacheRead::into_value)
    }

    pub async fn evaluation(
        &self,
        evaluation_id: EvaluationId,
    ) -> LockerRoomResult<EvaluationSubmission> {
        self.client
            .fetch_query(
                keys::evaluation(evaluation_id),
                self.options(),
                from_api(&self.api, move |api| async move {
                    api.evaluation(evaluation_id).await
                }),
            )
            .await
            .map(CacheRead::into_value)
    }

    pub async fn submit_evaluation(
        &self,
        evaluation: NewEvaluation,
    ) -> LockerRoomResult<EvaluationSubmission> {
        let template = self.template(evaluation.template_id).await?;
        validate_answers(&template, &evaluation.answers)?;

        let submitted = self
            .client
            .mutation::<EvaluationSubmission>("submit_evaluation")
            .reconcile_with::<Vec<EvaluationSubmission>, _>(
                keys::my_evaluations(),
                |before, submitted| {
                    before.map(|mine| {
                        let mut next = mine.clone();
                        next.retain(|e| e.id != submitted.id);
                        next.push(submitted.clone());
                        next
                    })
                },
            )
            .invalidates(keys::analytics(evaluation.student_id))
            .execute(self.api.submit_evaluation(&evaluation))
            .await?;

        self.client
            .set_query_data(keys::evaluation(submitted.id), submitted.clone());
        tracing::info!(
            evaluation_id = %submitted.id,
            template_id = %submitted.template_id,
            "Submitted evaluation"
        );
        Ok(submitted)
    }
}

fn upsert(templates: &[EvaluationTemplate], saved: &EvaluationTemplate) -> Vec<EvaluationTemplate> {
    let mut next = templates.to_vec();
    match next.iter_mut().find(|t| t.id == saved.id) {
        Some(slot) => *slot = saved.clone(),
        None => next.push(saved.clone()),
    }
    next
}

/// Field errors from a failed save, mapped to builder positions. Errors
/// without a position (e.g. the title) are skipped.
pub fn field_locations(err: &LockerRoomError) -> Vec<(FieldLocation, String)> {
    err.field_errors()
        .iter()
        .filter_map(|e| locate(e).map(|location| (location, e.message.clone())))
        .collect()
}

//! Completion notifier — background delivery of rendered reports.
//!
//! Runs after the completion transaction has committed, outside the request.
//! Failures are logged with their SMTP diagnostics and never reach the
//! caller; the inspection stays completed regardless.

use uuid::Uuid;

use inspection_core::error::InspectionError;
use inspection_core::service::ReportBundle;
use inspection_core::types::{Inspection, QuestionImage, User};
use inspection_report::{Composer, ComposerConfig};

use crate::state::SharedState;

/// Render the report for an answer row: load the template file, fetch the
/// aggregate bundle, read image bytes from storage (skipping unreadable
/// files), and compose the document.
pub async fn render_report(
    state: &SharedState,
    answer_id: Uuid,
) -> Result<(Vec<u8>, ReportBundle), InspectionError> {
    let bundle = state.service.report_bundle(answer_id).await?;

    let template = tokio::fs::read(&state.template_path).await.map_err(|e| {
        InspectionError::TemplateMissing(format!("{}: {e}", state.template_path.display()))
    })?;

    let mut loaded: Vec<(QuestionImage, Vec<u8>)> = Vec::with_capacity(bundle.images.len());
    for image in &bundle.images {
        if let Some(bytes) = state.storage.load_by_url(&image.image_url).await {
            loaded.push((image.clone(), bytes));
        }
    }

    let composer = Composer::new(ComposerConfig {
        image_width: state.report_image_box.0,
        image_height: state.report_image_box.1,
    });
    let buffer = composer.render(&template, &bundle, &loaded)?;
    Ok((buffer, bundle))
}

/// Fire-and-forget completion mail. Spawned after the collapse commits.
pub fn spawn_completion_notification(state: SharedState, inspection_id: Uuid, answer_id: Uuid) {
    tokio::spawn(async move {
        if let Err(e) = send_completion(&state, inspection_id, answer_id).await {
            tracing::error!(
                inspection_id = %inspection_id,
                error = %e,
                "completion notification failed"
            );
        }
    });
}

async fn send_completion(
    state: &SharedState,
    inspection_id: Uuid,
    answer_id: Uuid,
) -> anyhow::Result<()> {
    let Some(mailer) = &state.mailer else {
        tracing::debug!(inspection_id = %inspection_id, "mailer unconfigured; skipping completion mail");
        return Ok(());
    };
    let Some(contact) = state.service.completion_contact(inspection_id).await? else {
        tracing::info!(
            inspection_id = %inspection_id,
            "organization has no contact email; completion mail skipped"
        );
        return Ok(());
    };

    let (buffer, bundle) = render_report(state, answer_id).await?;
    mailer
        .send_completion(&contact, &bundle.inspection, buffer)
        .await?;
    tracing::info!(inspection_id = %inspection_id, to = %contact, "completion report delivered");
    Ok(())
}

/// Fire-and-forget assignment notice.
pub fn spawn_assignment_notification(state: SharedState, inspection: Inspection, assignee: User) {
    tokio::spawn(async move {
        if let Err(e) = send_assignment(&state, &inspection, &assignee).await {
            tracing::error!(
                inspection_id = %inspection.id,
                user_id = %assignee.id,
                error = %e,
                "assignment notification failed"
            );
        }
    });
}

async fn send_assignment(
    state: &SharedState,
    inspection: &Inspection,
    assignee: &User,
) -> anyhow::Result<()> {
    let Some(mailer) = &state.mailer else {
        return Ok(());
    };
    if assignee.email.is_none() {
        tracing::info!(user_id = %assignee.id, "assignee has no email; notice skipped");
        return Ok(());
    }

    let (organization, site, device) = state.service.assignment_context(inspection).await?;
    let device_label = match &device.model_name {
        Some(model) => format!("{model} ({})", device.serial_no),
        None => device.serial_no.clone(),
    };

    mailer
        .send_assignment(
            assignee,
            inspection,
            &organization.name,
            site.as_ref().map(|s| s.name.as_str()),
            &device_label,
        )
        .await
}

//! Confirmation Email
//!
//! Sent after the enrollment row is committed. Delivery failure is logged
//! and leaves `confirmation_email_sent` false; it never undoes enrollment.

use enroll_core::{
    escape_html, format_usd, EmailMessage, EmailSender, Enrollment, EnrollmentStore,
};

pub fn compose(to: &str, user_name: &str, enrollment: &Enrollment) -> EmailMessage {
    let info = enrollment.course_tier.info();
    let name = escape_html(user_name);
    let link = escape_html(enrollment.access_link.as_deref().unwrap_or_default());
    let amount = format_usd(enrollment.amount_paid);

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #4F46E5;">Welcome, {name}!</h1>
  <p>Your enrollment in the <strong>{tier}</strong> course has been confirmed.</p>
  <div style="background-color: #F3F4F6; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h2 style="margin-top: 0;">Course Details</h2>
    <p><strong>Level:</strong> {tier}</p>
    <p><strong>Duration:</strong> {duration}</p>
    <p><strong>Schedule:</strong> {schedule}</p>
    <p><strong>Amount Paid:</strong> {amount}</p>
  </div>
  <div style="background-color: #EEF2FF; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h2 style="margin-top: 0; color: #4F46E5;">Join Your Live Classes</h2>
    <a href="{link}">Open Zoom Classroom</a>
    <p style="font-size: 14px; color: #6B7280;">Zoom Link: {link}</p>
  </div>
  <p>Join the link 5 minutes before your first class.</p>
</div>"#,
        tier = info.name,
        duration = info.duration,
        schedule = info.schedule,
    );

    EmailMessage {
        to: to.to_string(),
        subject: "Welcome - Your Enrollment is Confirmed!".into(),
        html,
    }
}

/// Claim the row's confirmation, then send it.
///
/// Returns whether the confirmation is out, or owned by a concurrent
/// delivery of the same completion. A failed send releases the claim.
pub async fn send_confirmation(
    email: &dyn EmailSender,
    store: &dyn EnrollmentStore,
    enrollment: &Enrollment,
    to: &str,
    user_name: &str,
) -> bool {
    match store.claim_confirmation(enrollment.id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(enrollment_id = %enrollment.id, "Confirmation already claimed");
            return true;
        }
        Err(e) => {
            tracing::warn!(
                enrollment_id = %enrollment.id,
                error = %e,
                "Could not claim confirmation, not sending"
            );
            return false;
        }
    }

    let message = compose(to, user_name, enrollment);

    if let Err(e) = email.send(&message).await {
        tracing::warn!(enrollment_id = %enrollment.id, error = %e, "Confirmation email failed");
        if let Err(e) = store.release_confirmation(enrollment.id).await {
            tracing::warn!(
                enrollment_id = %enrollment.id,
                error = %e,
                "Confirmation claim not released"
            );
        }
        return false;
    }

    tracing::info!(enrollment_id = %enrollment.id, to, "Confirmation email sent");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingEmail;
    use chrono::Utc;
    use enroll_core::{CourseTier, MemoryEnrollmentStore, PaidEnrollment, PaymentStatus};
    use uuid::Uuid;

    async fn stored_enrollment(store: &MemoryEnrollmentStore) -> Enrollment {
        let tier = CourseTier::Advanced;
        store
            .upsert_paid_enrollment(&PaidEnrollment {
                user_id: Uuid::new_v4(),
                course_tier: tier,
                amount_paid: tier.price_cents(),
                payment_session_id: "cs_1".into(),
                payment_intent_id: None,
                access_link: tier.access_link().into(),
            })
            .await
            .unwrap()
            .enrollment
    }

    #[tokio::test]
    async fn test_second_send_is_skipped() {
        let store = MemoryEnrollmentStore::new();
        let email = RecordingEmail::new();
        let enrollment = stored_enrollment(&store).await;

        assert!(send_confirmation(&email, &store, &enrollment, "ada@example.com", "Ada").await);
        assert!(send_confirmation(&email, &store, &enrollment, "ada@example.com", "Ada").await);

        assert_eq!(email.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_send_releases_claim() {
        let store = MemoryEnrollmentStore::new();
        let enrollment = stored_enrollment(&store).await;

        let failing = RecordingEmail::failing();
        assert!(!send_confirmation(&failing, &store, &enrollment, "ada@example.com", "Ada").await);

        let email = RecordingEmail::new();
        assert!(send_confirmation(&email, &store, &enrollment, "ada@example.com", "Ada").await);
        assert_eq!(email.sent().await.len(), 1);
    }

    #[test]
    fn test_compose_includes_course_details() {
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_tier: CourseTier::Beginner,
            payment_status: PaymentStatus::Paid,
            amount_paid: 25_000,
            payment_session_id: Some("cs_1".into()),
            payment_intent_id: None,
            access_link: Some(CourseTier::Beginner.access_link().into()),
            confirmation_email_sent: false,
            enrolled_at: Utc::now(),
        };

        let message = compose("ada@example.com", "<Ada>", &enrollment);

        assert_eq!(message.to, "ada@example.com");
        assert!(message.html.contains("Beginner"));
        assert!(message.html.contains("12 weeks"));
        assert!(message.html.contains("8:00–9:30 AM EST"));
        assert!(message.html.contains("$250.00"));
        assert!(message.html.contains("https://zoom.us/j/beginner-class"));
        assert!(message.html.contains("&lt;Ada&gt;"));
    }
}

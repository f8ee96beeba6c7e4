//! SMTP mailer — completion reports and assignment notices.
//!
//! The transport is built once at startup and shared process-wide. Callers
//! must tolerate its failure modes; nothing here propagates past the
//! background task that invoked it.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use inspection_core::types::{Inspection, User};

use crate::config::SmtpConfig;

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &SmtpConfig) -> anyhow::Result<Self> {
        let mut builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from: config.from.parse()?,
        })
    }

    /// Completion report: the rendered document goes out as a `.docx`
    /// attachment with text and HTML bodies.
    pub async fn send_completion(
        &self,
        to: &str,
        inspection: &Inspection,
        document: Vec<u8>,
    ) -> anyhow::Result<()> {
        let title = inspection
            .title
            .clone()
            .unwrap_or_else(|| format!("Үзлэг {}", inspection.id));
        let completed = inspection
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();

        let text_body = format!(
            "Үзлэг дууссан.\n\nҮзлэгийн дугаар: {}\nДууссан огноо: {}\n\nТайланг хавсралтаас үзнэ үү.",
            inspection.id, completed
        );
        let html_body = format!(
            "<p>Үзлэг дууссан.</p><p>Үзлэгийн дугаар: <b>{}</b><br/>Дууссан огноо: {}</p><p>Тайланг хавсралтаас үзнэ үү.</p>",
            inspection.id, completed
        );

        let attachment = Attachment::new(format!("{title}.docx"))
            .body(document, ContentType::parse(DOCX_MIME)?);

        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(format!("Үзлэг дууссан: {title}"))
            .multipart(
                MultiPart::mixed()
                    .multipart(
                        MultiPart::alternative()
                            .singlepart(SinglePart::plain(text_body))
                            .singlepart(SinglePart::html(html_body)),
                    )
                    .singlepart(attachment),
            )?;

        self.transport.send(email).await?;
        Ok(())
    }

    /// Assignment notice sent to the inspector when an inspection is
    /// (re)assigned to them.
    pub async fn send_assignment(
        &self,
        assignee: &User,
        inspection: &Inspection,
        organization_name: &str,
        site_name: Option<&str>,
        device_label: &str,
    ) -> anyhow::Result<()> {
        let Some(to) = assignee.email.as_deref() else {
            anyhow::bail!("assignee {} has no email", assignee.id);
        };
        let title = inspection
            .title
            .clone()
            .unwrap_or_else(|| format!("Үзлэг {}", inspection.id));

        let body = format!(
            "Сайн байна уу, {}.\n\n\
             Танд үзлэг оноогдлоо.\n\n\
             Үзлэг: {}\n\
             Төрөл: {} / {}\n\
             Байгууллага: {}\n\
             Байршил: {}\n\
             Төхөөрөмж: {}\n\n\
             Аппликэйшн руу нэвтэрч үзлэгээ эхлүүлнэ үү.",
            assignee.full_name,
            title,
            inspection.kind.as_str(),
            inspection.schedule_type.as_str(),
            organization_name,
            site_name.unwrap_or("-"),
            device_label,
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(format!("Үзлэг оноогдлоо: {title}"))
            .singlepart(SinglePart::plain(body))?;

        self.transport.send(email).await?;
        Ok(())
    }
}

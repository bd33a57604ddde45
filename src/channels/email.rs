use crate::channels::{DeliveryChannel, OutboundMessage, Recipient};
use crate::domain::notification::NotificationMedium;
use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub struct SmtpEmailChannel {
    pub from: String,
    pub transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailChannel {
    pub fn new(host: &str, port: u16, username: &str, password: &str, from: &str) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self {
            from: from.to_string(),
            transport,
        })
    }
}

pub fn render_body(recipient_name: &str, body: &str) -> String {
    format!("Hello {},\n\n{}\n\nSee you at the event!\n", recipient_name, body)
}

#[async_trait::async_trait]
impl DeliveryChannel for SmtpEmailChannel {
    fn medium(&self) -> NotificationMedium {
        NotificationMedium::Email
    }

    async fn deliver(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<()> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(recipient.buyer.email.parse()?)
            .subject(message.title.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(&recipient.buyer.name, &message.body))?;

        self.transport.send(email).await?;
        Ok(())
    }
}

//! Outgoing email: booking confirmations, contact notifications, password resets.

use askama::Template;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::Path;

use crate::config::{Config, EmailTransportConfig};
use crate::error::AppError;
use crate::model::booking::Booking;
use crate::model::content::ContactMessage;

pub struct Mailer {
    transport: MailTransport,
    from_email: String,
    from_name: String,
    notify_email: Option<String>,
    resort_name: String,
    base_url: String,
}

enum MailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl Mailer {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let email_config = &config.email;

        let transport = match &email_config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled");
                }

                let builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| AppError::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                MailTransport::Smtp(builder.build())
            }
            EmailTransportConfig::File { path } => {
                let dir = Path::new(path);
                if !dir.exists() {
                    std::fs::create_dir_all(dir).map_err(|e| AppError::Internal {
                        operation: format!("create email directory: {e}"),
                    })?;
                }
                tracing::info!(dir = %path, "Emails will be written to disk");
                MailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(dir))
            }
        };

        Ok(Self {
            transport,
            from_email: email_config.from_email.clone(),
            from_name: email_config.from_name.clone(),
            notify_email: email_config.notify_email.clone(),
            resort_name: config.resort_name.clone(),
            base_url: config.public_base_url.clone(),
        })
    }

    pub async fn send_booking_confirmation(&self, booking: &Booking, room_name: &str) -> Result<(), AppError> {
        let subject = format!("{} - booking {} confirmed", self.resort_name, booking.booking_ref);
        let body = booking_confirmation_body(&self.resort_name, booking, room_name)?;
        self.send(&booking.guest_email, Some(&booking.guest_name), &subject, body)
            .await
    }

    /// Forwards a contact form submission to the resort inbox, if one is configured.
    pub async fn send_contact_notification(&self, message: &ContactMessage) -> Result<(), AppError> {
        let Some(to) = self.notify_email.as_deref() else {
            tracing::debug!("No notification inbox configured, skipping contact email");
            return Ok(());
        };

        let subject = format!(
            "New enquiry from {}: {}",
            message.name,
            message.subject.as_deref().unwrap_or("(no subject)")
        );
        let body = render(&ContactNotificationEmail {
            name: &message.name,
            email: &message.email,
            phone: message.phone.as_deref().unwrap_or("-"),
            lines: message.message.lines().collect(),
        })?;
        self.send(to, None, &subject, body).await
    }

    pub async fn send_password_reset(&self, to_email: &str, to_name: Option<&str>, token: &str) -> Result<(), AppError> {
        let link = reset_link(&self.base_url, to_email, token);
        let body = render(&PasswordResetEmail {
            name: to_name.unwrap_or_default(),
            resort_name: &self.resort_name,
            link: &link,
        })?;
        self.send(to_email, to_name, "Password reset request", body).await
    }

    /// Arbitrary message written by an admin.
    pub async fn send_custom(&self, to_email: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let body = render(&MessageEmail {
            lines: body.lines().collect(),
        })?;
        self.send(to_email, None, subject, body).await
    }

    async fn send(&self, to_email: &str, to_name: Option<&str>, subject: &str, body: String) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal {
                operation: format!("parse from address: {e}"),
            })?;

        let to = match to_name {
            Some(name) if !name.is_empty() => format!("{name} <{to_email}>"),
            _ => to_email.to_string(),
        }
        .parse::<Mailbox>()
        .map_err(|_| AppError::bad_request(format!("Invalid recipient address: {to_email}")))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| AppError::Internal {
                operation: format!("build email message: {e}"),
            })?;

        match &self.transport {
            MailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| AppError::Upstream {
                    service: "Email relay",
                    message: e.to_string(),
                })?;
            }
            MailTransport::File(file) => {
                file.send(message).await.map_err(|e| AppError::Internal {
                    operation: format!("write email file: {e}"),
                })?;
            }
        }

        tracing::info!(to = to_email, subject, "Email sent");
        Ok(())
    }
}

#[derive(Template)]
#[template(path = "email/booking_confirmation.html")]
struct BookingConfirmationEmail<'a> {
    guest_name: &'a str,
    resort_name: &'a str,
    booking_ref: &'a str,
    room_name: &'a str,
    check_in: String,
    check_out: String,
    adults: i32,
    children: i32,
    total_amount: i64,
}

#[derive(Template)]
#[template(path = "email/contact_notification.html")]
struct ContactNotificationEmail<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    lines: Vec<&'a str>,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmail<'a> {
    name: &'a str,
    resort_name: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/message.html")]
struct MessageEmail<'a> {
    lines: Vec<&'a str>,
}

// Templates ending in .html are auto-escaped
fn render(template: &impl Template) -> Result<String, AppError> {
    template.render().map_err(|e| AppError::Internal {
        operation: format!("render email: {e}"),
    })
}

fn booking_confirmation_body(resort_name: &str, booking: &Booking, room_name: &str) -> Result<String, AppError> {
    render(&BookingConfirmationEmail {
        guest_name: &booking.guest_name,
        resort_name,
        booking_ref: &booking.booking_ref,
        room_name,
        check_in: booking.check_in.format("%d %b %Y").to_string(),
        check_out: booking.check_out.format("%d %b %Y").to_string(),
        adults: booking.adults,
        children: booking.children,
        total_amount: booking.total_amount,
    })
}

fn reset_link(base_url: &str, email: &str, token: &str) -> String {
    format!(
        "{}/admin/reset-password?email={}&token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(email),
        urlencoding::encode(token)
    )
}

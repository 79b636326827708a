//! Notification email templates rendered as HTML + plain text pairs.

use crate::db::models::ContactSubmission;

/// Customer auto-response sent after an accepted submission.
pub struct LeadAutoResponse<'a> {
    pub name: &'a str,
    pub restaurant: &'a str,
    pub wants_trial: bool,
    pub demo_phone: Option<&'a str>,
    pub domain: &'a str,
}

impl LeadAutoResponse<'_> {
    pub fn subject(&self) -> String {
        "Welcome aboard - your setup details".to_string()
    }

    fn trial_text(&self) -> &'static str {
        if self.wants_trial {
            "Since you requested a trial, we'll get you set up immediately after our call."
        } else {
            "We'll discuss the best setup options for your restaurant during our call."
        }
    }

    pub fn render_html(&self) -> String {
        let demo_line = self.demo_phone.map_or(String::new(), |phone| {
            format!(
                r#"<div class="demo-number">Try our demo line: {}</div>"#,
                html_escape(phone)
            )
        });

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Welcome aboard</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .header {{
            background-color: #2c3e50;
            color: #ffffff;
            padding: 20px;
            text-align: center;
            border-radius: 8px 8px 0 0;
        }}
        .content {{
            padding: 20px;
            background-color: #f9f9f9;
        }}
        .demo-number {{
            font-size: 20px;
            font-weight: bold;
            background-color: #ecf0f1;
            padding: 10px;
            border-radius: 5px;
            text-align: center;
            margin: 15px 0;
        }}
        .footer {{
            padding: 20px;
            text-align: center;
            font-size: 12px;
            color: #666;
        }}
    </style>
</head>
<body>
    <div class="header"><h1>Thanks for getting in touch!</h1></div>
    <div class="content">
        <h2>Hi {name},</h2>
        <p>Thank you for your interest! We're excited to help <strong>{restaurant}</strong>
        never miss another booking.</p>
        <h3>What happens next:</h3>
        <ul>
            <li>Our team will review your requirements</li>
            <li>We'll call you within 24 hours to discuss your needs</li>
            <li>{trial_text}</li>
        </ul>
        {demo_line}
        <p>In the meantime, you can read our
        <a href="https://{domain}/setup-guide">setup guide</a> or
        <a href="https://{domain}/book-call">book a specific time</a>.</p>
        <p>Questions? Just reply to this email.</p>
        <p>Best regards,<br><strong>The Sales Team</strong></p>
    </div>
    <div class="footer">
        <p>This email was sent by {domain}</p>
    </div>
</body>
</html>"#,
            name = html_escape(self.name),
            restaurant = html_escape(self.restaurant),
            trial_text = self.trial_text(),
            demo_line = demo_line,
            domain = html_escape(self.domain),
        )
    }

    pub fn render_text(&self) -> String {
        let demo_line = self
            .demo_phone
            .map_or(String::new(), |phone| format!("\nTry our demo line: {phone}\n"));

        format!(
            r"Hi {name},

Thank you for your interest! We're excited to help {restaurant} never miss
another booking.

What happens next:
1. Our team will review your requirements
2. We'll call you within 24 hours to discuss your needs
3. {trial_text}
{demo_line}
Setup guide: https://{domain}/setup-guide
Book a specific time: https://{domain}/book-call

Questions? Just reply to this email.

Best regards,
The Sales Team",
            name = self.name,
            restaurant = self.restaurant,
            trial_text = self.trial_text(),
            demo_line = demo_line,
            domain = self.domain,
        )
    }
}

/// Internal alert sent to the sales team for each new lead.
pub struct SalesAlert<'a> {
    pub submission: &'a ContactSubmission,
    pub domain: &'a str,
}

impl SalesAlert<'_> {
    pub fn subject(&self) -> String {
        format!(
            "New Lead: {} - Trial: {}",
            self.submission.restaurant_name,
            if self.submission.wants_trial { "YES" } else { "NO" }
        )
    }

    fn lead_url(&self) -> String {
        format!("https://{}/admin/leads/{}", self.domain, self.submission.id)
    }

    pub fn render_html(&self) -> String {
        let s = self.submission;
        let trial = if s.wants_trial { "YES" } else { "NO" };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>New lead submitted</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .header {{
            background-color: #e74c3c;
            color: #ffffff;
            padding: 20px;
            text-align: center;
        }}
        .row {{ border-bottom: 1px solid #eee; padding: 8px 0; }}
        .label {{ font-weight: bold; color: #2c3e50; }}
        .trial-yes {{ color: #27ae60; font-weight: bold; }}
    </style>
</head>
<body>
    <div class="header"><h1>New lead submitted</h1></div>
    <div class="row"><span class="label">Name:</span> {name}</div>
    <div class="row"><span class="label">Email:</span>
        <a href="mailto:{email}">{email}</a></div>
    <div class="row"><span class="label">Restaurant:</span> <strong>{restaurant}</strong></div>
    <div class="row"><span class="label">Phone:</span>
        <a href="tel:{phone}">{phone}</a></div>
    <div class="row"><span class="label">Trial requested:</span>
        <span class="{trial_class}">{trial}</span></div>
    <div class="row"><span class="label">Submitted:</span> {submitted_at}</div>
    <p>Contact within 24 hours. <a href="{lead_url}">View lead details</a></p>
</body>
</html>"#,
            name = html_escape(&s.name),
            email = html_escape(&s.email),
            restaurant = html_escape(&s.restaurant_name),
            phone = html_escape(&s.phone),
            trial_class = if s.wants_trial { "trial-yes" } else { "" },
            trial = trial,
            submitted_at = s.submitted_at.to_rfc3339(),
            lead_url = self.lead_url(),
        )
    }

    pub fn render_text(&self) -> String {
        let s = self.submission;
        format!(
            r"NEW LEAD SUBMITTED

Name: {name}
Email: {email}
Restaurant: {restaurant}
Phone: {phone}
Trial requested: {trial}
Submitted: {submitted_at}

Contact within 24 hours.
Lead details: {lead_url}",
            name = s.name,
            email = s.email,
            restaurant = s.restaurant_name,
            phone = s.phone,
            trial = if s.wants_trial { "YES" } else { "NO" },
            submitted_at = s.submitted_at.to_rfc3339(),
            lead_url = self.lead_url(),
        )
    }
}

/// Simple HTML escaping for template values.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::LeadStatus;
    use chrono::Utc;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            id: 42,
            name: "Mario Rossi".to_string(),
            email: "mario@pizzaroma.co.uk".to_string(),
            restaurant_name: "Pizza Roma".to_string(),
            phone: "+447123456789".to_string(),
            wants_trial: true,
            status: LeadStatus::New,
            notes: None,
            lead_source: "website_contact_form".to_string(),
            consent_given: true,
            ip_address: None,
            user_agent: None,
            submitted_at: Utc::now(),
            updated_at: Utc::now(),
            deletion_requested: false,
            data_retention_date: Utc::now(),
        }
    }

    #[test]
    fn auto_response_renders_both_parts() {
        let template = LeadAutoResponse {
            name: "Mario Rossi",
            restaurant: "Pizza Roma",
            wants_trial: true,
            demo_phone: Some("+44 7777 000000"),
            domain: "example.com",
        };

        let html = template.render_html();
        assert!(html.contains("Mario Rossi"));
        assert!(html.contains("Pizza Roma"));
        assert!(html.contains("+44 7777 000000"));
        assert!(html.contains("set up immediately"));

        let text = template.render_text();
        assert!(text.contains("Pizza Roma"));
        assert!(text.contains("demo line"));
    }

    #[test]
    fn auto_response_omits_missing_demo_line() {
        let template = LeadAutoResponse {
            name: "Mario",
            restaurant: "Pizza Roma",
            wants_trial: false,
            demo_phone: None,
            domain: "example.com",
        };
        assert!(!template.render_html().contains("demo line"));
        assert!(template.render_html().contains("best setup options"));
    }

    #[test]
    fn auto_response_escapes_html_in_name() {
        let template = LeadAutoResponse {
            name: "<script>alert('xss')</script>",
            restaurant: "Pizza Roma",
            wants_trial: false,
            demo_phone: None,
            domain: "example.com",
        };

        let html = template.render_html();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn sales_alert_subject_flags_trial() {
        let alert = SalesAlert {
            submission: &submission(),
            domain: "example.com",
        };
        assert_eq!(alert.subject(), "New Lead: Pizza Roma - Trial: YES");
    }

    #[test]
    fn sales_alert_links_to_lead() {
        let alert = SalesAlert {
            submission: &submission(),
            domain: "example.com",
        };
        assert!(alert.render_html().contains("https://example.com/admin/leads/42"));
        assert!(alert.render_text().contains("https://example.com/admin/leads/42"));
    }
}

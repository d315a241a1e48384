use super::{ModelClient, Unavailable};
use async_trait::async_trait;
use std::time::Duration;

const SAMPLE_REPLY: &str = r#"```json
{
  "danger_score": 70,
  "summary": "This email shows several hallmarks of a phishing attempt. The sender domain does not match the brand it claims to represent, and the message uses urgent language designed to pressure you into acting quickly without thinking.",
  "reasons_bulleted": [
    "Sender domain does not match claimed brand",
    "Urgency language detected (\"act now\", \"limited time\")",
    "Link destination does not match display text"
  ],
  "next_steps": "Do not click any links or download attachments. Mark the email as phishing and report it to your email provider.",
  "fishy_phrases": ["act now", "limited time"]
}
```"#;

/// Canned model for demos and offline development: replies with a fixed
/// assessment after a short simulated delay.
pub struct SampleModel {
    delay: Duration,
}

impl Default for SampleModel {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
        }
    }
}

impl SampleModel {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ModelClient for SampleModel {
    async fn generate(&self, _prompt: &str) -> Result<String, Unavailable> {
        log::info!("[gemini] sample mode, simulating AI delay...");
        tokio::time::sleep(self.delay).await;
        Ok(SAMPLE_REPLY.to_string())
    }
}

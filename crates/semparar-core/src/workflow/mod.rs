//! Report workflow: the sequential state machine driving one export run.
//!
//! One run owns one browser session and moves through login, captcha
//! resolution, portal load, and the two report stages in strict order,
//! publishing progress over the correlation channel and suspending on
//! human replies. Any error short of a per-email submission failure
//! propagates to the single top-level handler in [`ReportRun::send`],
//! which emits exactly one final notification and always releases the
//! session.

pub mod portal;
pub mod progress;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local, NaiveDate};
use semparar_types::config::{BrowserSettings, ReportConfig};
use semparar_types::error::{UiError, WorkflowError};
use semparar_types::message::{
    Action, ActionKind, ActionResponse, Notification, NotificationData, OutboundMessage,
    TRIGGER_TOPIC,
};
use tokio::sync::Mutex;

use crate::captcha;
use crate::channel::{CorrelationChannel, Transport, REPLY_TIMEOUT};
use crate::ui::{UiDriver, UiLauncher, ELEMENT_WAIT};
use self::progress::Progress;

/// Settle delay after submitting a report or opening a panel.
const SETTLE_SHORT: Duration = Duration::from_secs(1);

/// Settle delay after submitting a captcha answer.
const CAPTCHA_SETTLE: Duration = Duration::from_secs(2);

/// Bound on the authenticated-landing-page wait after login.
const PORTAL_LOAD_WAIT: Duration = Duration::from_secs(60);

const TITLE: &str = "Sem Parar";
const CAPTCHA_TITLE: &str = "Sem Parar: Resolva a captcha";
const SUCCESS_TITLE: &str = "Sem Parar: Envios finalizados com sucesso! 🥳";
const FAILURE_TITLE: &str = "Sem Parar: Envios finalizados com falha! 😭";
const UNKNOWN_ERROR: &str = "Erro desconhecido";

/// Shared handle to the run's browser session. The supervisor holds a clone
/// so it can release the session out from under a replaced run.
pub type SessionSlot<D> = Arc<Mutex<Option<D>>>;

/// Release the session held in `slot`, if any. Idempotent: the slot is
/// emptied first, so a second call is a no-op.
pub async fn release_session<D: UiDriver>(slot: &SessionSlot<D>) {
    let driver = slot.lock().await.take();
    if let Some(driver) = driver {
        if let Err(err) = driver.quit().await {
            tracing::warn!(%err, "browser session release failed");
        }
    }
}

/// How a run ended, as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All stages ran; the completion notification went out.
    Completed,
    /// The human cancelled during captcha; clean early termination.
    Cancelled,
    /// A fatal error; the failure notification went out.
    Failed,
}

/// Internal result of the stage sequence, before final notification.
enum Execution {
    Finished(Vec<String>),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptchaFlow {
    Solved,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptchaVerdict {
    Success,
    Retry,
    LengthError,
}

/// The `[start, end]` report window, already formatted for the portal's
/// date inputs.
#[derive(Debug, Clone)]
pub struct DateWindow {
    pub start: String,
    pub end: String,
}

impl DateWindow {
    /// Window ending today, reaching `past_days` back.
    pub fn ending_today(past_days: i64) -> Self {
        Self::ending_at(Local::now().date_naive(), past_days)
    }

    /// Window ending at `end`, reaching `past_days` back. `past_days` is
    /// non-negative (clamped at the config boundary).
    pub fn ending_at(end: NaiveDate, past_days: i64) -> Self {
        let start = end
            .checked_sub_days(Days::new(past_days.max(0) as u64))
            .unwrap_or(end);
        Self {
            start: start.format(portal::DATE_FORMAT).to_string(),
            end: end.format(portal::DATE_FORMAT).to_string(),
        }
    }
}

/// One report-export run.
pub struct ReportRun<T, L: UiLauncher> {
    channel: CorrelationChannel<T>,
    launcher: L,
    browser: BrowserSettings,
    config: ReportConfig,
    session: SessionSlot<L::Driver>,
    progress: Progress,
}

impl<T: Transport, L: UiLauncher> ReportRun<T, L> {
    pub fn new(
        channel: CorrelationChannel<T>,
        launcher: L,
        browser: BrowserSettings,
        config: ReportConfig,
    ) -> Self {
        Self {
            channel,
            launcher,
            browser,
            config,
            session: Arc::new(Mutex::new(None)),
            progress: Progress::new(),
        }
    }

    /// Handle the supervisor keeps for out-of-band session release.
    pub fn session_slot(&self) -> SessionSlot<L::Driver> {
        self.session.clone()
    }

    /// Run the workflow to completion, cancellation, or failure.
    ///
    /// Exactly one final notification goes out on the completion and
    /// failure paths, none on cancellation; the browser session is
    /// released on every path.
    pub async fn send(mut self) -> RunOutcome {
        let outcome = match self.execute().await {
            Ok(Execution::Finished(lines)) => {
                if let Err(err) = self.notify(SUCCESS_TITLE, &lines.join("\n"), 100).await {
                    tracing::warn!(%err, "completion notification failed");
                }
                RunOutcome::Completed
            }
            Ok(Execution::Cancelled) => {
                tracing::info!("run cancelled by the user during captcha");
                RunOutcome::Cancelled
            }
            Err(error) => {
                tracing::error!(%error, "report run failed");
                if let Err(err) = self.notify(FAILURE_TITLE, &error.to_string(), 100).await {
                    tracing::warn!(%err, "failure notification failed");
                }
                RunOutcome::Failed
            }
        };
        release_session(&self.session).await;
        outcome
    }

    async fn execute(&mut self) -> Result<Execution, WorkflowError> {
        self.notify(TITLE, "Iniciando envio de relatórios", 0).await?;

        let driver = self.launcher.launch(&self.browser).await?;
        *self.session.lock().await = Some(driver.clone());

        // Login form.
        driver.goto(portal::LOGIN_URL).await?;
        driver
            .type_into(portal::USERNAME_FIELD, &self.config.username)
            .await?;
        driver
            .type_into(portal::PASSWORD_FIELD, &self.config.password)
            .await?;

        if self.solve_captcha_if_present(&driver).await? == CaptchaFlow::Cancelled {
            return Ok(Execution::Cancelled);
        }

        // Submit login and wait for the authenticated landing page.
        self.notify(TITLE, "Carregando o portal...", 10).await?;
        driver.click(portal::LOGIN_BUTTON).await?;
        driver
            .wait_for_url(portal::LANDING_URL_MARKER, PORTAL_LOAD_WAIT)
            .await
            .map_err(WorkflowError::PortalLoad)?;

        let window = DateWindow::ending_today(self.config.past_days());
        self.notify(
            TITLE,
            &format!(
                "Iniciando envio de relatórios de {} até {}",
                window.start, window.end
            ),
            25,
        )
        .await?;

        driver.enter_frame(portal::MAIN_FRAME).await?;

        let mut lines = Vec::new();
        self.statement_stage(&driver, &window, &mut lines).await?;
        self.receipts_stage(&driver, &window, &mut lines).await?;

        Ok(Execution::Finished(lines))
    }

    /// Captcha presence check plus the solve loop.
    ///
    /// Absence of the captcha frame, or of the challenge image inside it,
    /// means the captcha is already satisfied -- success, not failure. The
    /// solve loop itself is unbounded by design: it retries with a fresh
    /// challenge until the portal accepts an answer or the human cancels.
    async fn solve_captcha_if_present(
        &mut self,
        driver: &L::Driver,
    ) -> Result<CaptchaFlow, WorkflowError> {
        if !driver.is_present(portal::CAPTCHA_FRAME).await? {
            return Ok(CaptchaFlow::Solved);
        }

        driver.enter_frame(portal::CAPTCHA_FRAME).await?;

        if !driver.wait_present(portal::CAPTCHA_IMAGE, ELEMENT_WAIT).await? {
            driver.leave_frame().await?;
            return Ok(CaptchaFlow::Solved);
        }

        loop {
            let css = driver
                .css_value(portal::CAPTCHA_IMAGE, "background-image")
                .await?;
            let image = captcha::extract_image(&css)?;

            let mut message = self.status(CAPTCHA_TITLE, "Resolva a captcha", 0);
            message.notification.data.image = Some(image);
            message.notification.data.actions = vec![
                Action {
                    action: ActionKind::Reply,
                    title: "Resolver".to_string(),
                },
                Action {
                    action: ActionKind::Cancel,
                    title: "Cancelar".to_string(),
                },
            ];

            let Some(response) = self
                .channel
                .send_and_await::<ActionResponse>(&message, REPLY_TIMEOUT)
                .await?
            else {
                // The message declares actions, so the channel always
                // waits; this arm never runs.
                continue;
            };

            if response.action == ActionKind::Cancel {
                return Ok(CaptchaFlow::Cancelled);
            }

            let answer = response.text.unwrap_or_default();
            driver.clear(portal::CAPTCHA_INPUT).await?;
            driver.type_and_submit(portal::CAPTCHA_INPUT, &answer).await?;
            tokio::time::sleep(CAPTCHA_SETTLE).await;

            match captcha_verdict(driver).await? {
                Some(CaptchaVerdict::Success) => {
                    driver.leave_frame().await?;
                    return Ok(CaptchaFlow::Solved);
                }
                verdict => {
                    tracing::info!(?verdict, "captcha attempt rejected, fetching a fresh challenge");
                    self.notify(TITLE, "Captcha não resolvida", 0).await?;
                }
            }
        }
    }

    /// Stage 1: the financial ("lançamento") report.
    ///
    /// Dates and message text are entered once; emails are then processed
    /// strictly in configured order. A per-email failure is recorded and
    /// reported, never fatal to the stage.
    async fn statement_stage(
        &mut self,
        driver: &L::Driver,
        window: &DateWindow,
        lines: &mut Vec<String>,
    ) -> Result<(), WorkflowError> {
        driver.click(portal::STATEMENT_MENU).await?;
        tokio::time::sleep(SETTLE_SHORT).await;

        driver
            .type_into(portal::STATEMENT_START_DATE, &window.start)
            .await?;
        driver
            .type_into(portal::STATEMENT_END_DATE, &window.end)
            .await?;
        driver
            .type_into(
                portal::STATEMENT_MESSAGE,
                &format!("Relatório de {} até {}", window.start, window.end),
            )
            .await?;

        let emails = self.config.emails.clone();
        for email in &emails {
            driver.type_into(portal::STATEMENT_EMAIL, email).await?;
            driver.click(portal::STATEMENT_SEND).await?;
            tokio::time::sleep(SETTLE_SHORT).await;
            driver.click(portal::STATEMENT_EXPORT).await?;

            let success = driver
                .wait_for_text(
                    portal::STATUS_SUMMARY,
                    portal::STATEMENT_SUCCESS_MARKER,
                    ELEMENT_WAIT,
                )
                .await?;

            if success {
                self.notify(
                    TITLE,
                    &format!("Relatório de lançamento enviado para {email}"),
                    50,
                )
                .await?;
            } else {
                let detail = self.status_detail(driver).await;
                self.notify(
                    &format!("Sem Parar: Erro relatório de lançamento > {email}"),
                    &detail,
                    50,
                )
                .await?;
            }

            lines.push(format!(
                "Relatório de lançamento para {email}: {}",
                outcome_mark(success)
            ));
        }

        Ok(())
    }

    /// Stage 2: the trip-receipts report. Same window, distinct panel and
    /// success marker; same continue-on-per-email-failure policy.
    async fn receipts_stage(
        &mut self,
        driver: &L::Driver,
        window: &DateWindow,
        lines: &mut Vec<String>,
    ) -> Result<(), WorkflowError> {
        driver.click(portal::RECEIPTS_MENU).await?;

        driver
            .type_into(portal::RECEIPTS_START_DATE, &window.start)
            .await?;
        driver
            .type_into(portal::RECEIPTS_END_DATE, &window.end)
            .await?;

        let emails = self.config.emails.clone();
        for email in &emails {
            driver.type_into(portal::RECEIPTS_EMAIL, email).await?;
            driver.click(portal::RECEIPTS_SEND).await?;

            let success = driver
                .wait_for_text(
                    portal::STATUS_SUMMARY,
                    portal::RECEIPTS_SUCCESS_MARKER,
                    ELEMENT_WAIT,
                )
                .await?;

            if success {
                self.notify(
                    TITLE,
                    &format!("Recibos de viagem enviados para {email}"),
                    75,
                )
                .await?;
            } else {
                let detail = self.status_detail(driver).await;
                self.notify(
                    &format!("Sem Parar: Erro recibos de viagem > {email}"),
                    &detail,
                    75,
                )
                .await?;
            }

            lines.push(format!(
                "Relatório de viagem para {email}: {}",
                outcome_mark(success)
            ));
        }

        Ok(())
    }

    /// Displayed error text of the status element, or the generic fallback.
    async fn status_detail(&self, driver: &L::Driver) -> String {
        driver
            .element_text(portal::STATUS_SUMMARY)
            .await
            .ok()
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }

    fn status(&mut self, title: &str, text: &str, progress: u32) -> OutboundMessage {
        let progress = self.progress.advance_to(progress);
        OutboundMessage {
            topic: TRIGGER_TOPIC.to_string(),
            notification: Notification {
                title: title.to_string(),
                message: text.to_string(),
                data: NotificationData {
                    tag: Some(portal::NOTIFICATION_TAG.to_string()),
                    progress,
                    ..NotificationData::default()
                },
            },
        }
    }

    async fn notify(
        &mut self,
        title: &str,
        text: &str,
        progress: u32,
    ) -> Result<(), semparar_types::error::ChannelError> {
        let message = self.status(title, text, progress);
        tracing::info!(title, progress = message.notification.data.progress, "publishing status");
        self.channel.publish(&message).await
    }
}

fn outcome_mark(success: bool) -> &'static str {
    if success {
        "Sucesso! ✅"
    } else {
        "Falha! ❌"
    }
}

/// Race the three result-text probes on the captcha message element.
///
/// Whichever substring appears first wins; implementations let a
/// non-matching probe run its full wait, so a match always settles ahead
/// of the misses. No winner inside the bound yields `None`.
async fn captcha_verdict<D: UiDriver>(driver: &D) -> Result<Option<CaptchaVerdict>, UiError> {
    tokio::select! {
        hit = driver.wait_for_text(portal::CAPTCHA_MESSAGE, portal::CAPTCHA_SUCCESS_MARKER, ELEMENT_WAIT) => {
            Ok(hit?.then_some(CaptchaVerdict::Success))
        }
        hit = driver.wait_for_text(portal::CAPTCHA_MESSAGE, portal::CAPTCHA_RETRY_MARKER, ELEMENT_WAIT) => {
            Ok(hit?.then_some(CaptchaVerdict::Retry))
        }
        hit = driver.wait_for_text(portal::CAPTCHA_MESSAGE, portal::CAPTCHA_LENGTH_MARKER, ELEMENT_WAIT) => {
            Ok(hit?.then_some(CaptchaVerdict::LengthError))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn date_window_formats_dd_mm_yyyy() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let window = DateWindow::ending_at(end, 30);
        assert_eq!(window.end, "15/03/2025");
        assert_eq!(window.start, "13/02/2025");
    }

    #[test]
    fn date_window_zero_days_collapses_to_end() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let window = DateWindow::ending_at(end, 0);
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn outcome_marks() {
        assert_eq!(outcome_mark(true), "Sucesso! ✅");
        assert_eq!(outcome_mark(false), "Falha! ❌");
    }
}

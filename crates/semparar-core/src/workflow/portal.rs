//! Portal-specific selectors, URLs, and locale strings.
//!
//! Everything here is tied to the Sem Parar business portal's markup and
//! Brazilian-Portuguese UI text. The success/retry markers are substring
//! probes against status elements; the menu selectors are positional
//! because the portal gives its side menu no stable ids.

use crate::ui::Target;

pub const LOGIN_URL: &str = "https://www.sempararempresas.com.br/login";

pub const USERNAME_FIELD: Target = Target::Id("UserName");
pub const PASSWORD_FIELD: Target = Target::Id("password");
pub const LOGIN_BUTTON: Target = Target::Id("btn-entrar");

/// URL fragment of the authenticated landing page.
pub const LANDING_URL_MARKER: &str = "Default.aspx";

pub const CAPTCHA_FRAME: Target = Target::Id("mt-captcha-1-iframe-1");
pub const CAPTCHA_IMAGE: Target = Target::Id("mtcap-image-1");
pub const CAPTCHA_INPUT: Target = Target::Id("mtcap-inputtext-1");
pub const CAPTCHA_MESSAGE: Target = Target::Id("mtcap-msg-1");

/// Captcha result-text markers, raced against each other.
pub const CAPTCHA_SUCCESS_MARKER: &str = "sucesso";
pub const CAPTCHA_RETRY_MARKER: &str = "tente novamente";
pub const CAPTCHA_LENGTH_MARKER: &str = "caracteres";

/// The portal content lives inside this frame after login.
pub const MAIN_FRAME: Target = Target::Name("main");

pub const STATEMENT_MENU: Target = Target::Css("#menu_lateral_geral a:nth-child(3)");
pub const STATEMENT_START_DATE: Target = Target::Id("dataInicialRelatorioLancamentoSTP");
pub const STATEMENT_END_DATE: Target = Target::Id("dataFinalRelatorioLancamentoSTP");
pub const STATEMENT_MESSAGE: Target = Target::Id("txaMsgRelatorioLancamentoSTP");
pub const STATEMENT_EMAIL: Target = Target::Id("txtEmailRelatorioLancamentoSTP");
pub const STATEMENT_SEND: Target = Target::Id("btnEnviarRelatorioLancamentoSTP");
pub const STATEMENT_EXPORT: Target = Target::Id("btnGerarExcel");

pub const RECEIPTS_MENU: Target = Target::Css("#menu_lateral_geral a:nth-child(4)");
pub const RECEIPTS_START_DATE: Target = Target::Id("DataInicio");
pub const RECEIPTS_END_DATE: Target = Target::Id("DataFim");
pub const RECEIPTS_EMAIL: Target = Target::Id("Email");
pub const RECEIPTS_SEND: Target = Target::Id("btnEnviar");

/// Shared status element both report panels write their result into.
pub const STATUS_SUMMARY: Target = Target::Css(".ValidateSummaryInformation");

pub const STATEMENT_SUCCESS_MARKER: &str = "sucesso";
pub const RECEIPTS_SUCCESS_MARKER: &str = "Os recibos foram enviados para o email informado";

/// Notification grouping tag echoed back in reply topics.
pub const NOTIFICATION_TAG: &str = "semparar-sendReportsToEmail";

pub const DATE_FORMAT: &str = "%d/%m/%Y";

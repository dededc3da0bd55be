// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use bizsuite_api::{ApiClient, OrdersQuery};
use bizsuite_app::{
    DiscountType, DocumentType, LookupEndpoint, LookupId, LookupItem, NotificationKind,
    Notifications, OrderDraft, Pagination, PaymentStatus, filter_orders,
};
use bizsuite_assistant::{Client as AssistantClient, Conversation};
use bizsuite_lookup::LookupSession;
use std::io::Write;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;

use crate::config::Config;
use crate::{Command, QuoteArgs};

/// Runs one command. Network commands get a single-threaded tokio runtime;
/// the assistant client is blocking and runs outside it.
pub fn execute<W: Write>(config: &Config, command: &Command, out: &mut W) -> Result<()> {
    match command {
        Command::Quote(quote) => write_quote(quote, out),
        Command::Chat { message } => chat(config, message, out),
        _ => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("start async runtime")?;
            runtime.block_on(async {
                let mut api = ApiRuntime::new(config)?;
                api.run(command, out).await
            })
        }
    }
}

pub struct ApiRuntime {
    client: ApiClient,
    session: LookupSession<ApiClient>,
    notifications: Notifications,
}

impl ApiRuntime {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ApiClient::new(&config.api_base_url(), config.api_timeout()?)?;
        let session = LookupSession::new(Arc::new(client.clone()), config.lookup_settings()?);
        info!(base_url = client.base_url(), "api session started");
        Ok(Self {
            client,
            session,
            notifications: Notifications::default(),
        })
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub async fn run<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        match command {
            Command::Lookup { endpoint, term } => self.lookup(*endpoint, term.as_deref(), out).await,
            Command::Batches { item_id } => self.batches(item_id, out).await,
            Command::Orders {
                term,
                document_type,
                page,
            } => self.orders(term.as_deref(), *document_type, *page, out).await,
            Command::PaymentStatus {
                number,
                status,
                amount,
            } => self.payment_status(number, *status, *amount, out).await,
            Command::Notifications => self.show_notifications(out).await,
            Command::Quote(_) | Command::Chat { .. } => {
                bail!("{} does not use the API session", command.name())
            }
        }
    }

    /// Loads the endpoint's cached list, then narrows it with a merged
    /// local and remote search when a term is given.
    pub async fn lookup<W: Write>(
        &self,
        endpoint: LookupEndpoint,
        term: Option<&str>,
        out: &mut W,
    ) -> Result<()> {
        let lookup = self.session.lookup(endpoint);
        let mut items = lookup.load_initial().await;
        if let Some(term) = term {
            items = lookup.search(term).await;
        }

        if items.is_empty() {
            writeln!(out, "no {} found", endpoint.as_str())?;
            return Ok(());
        }
        for item in &items {
            write_item(out, endpoint, item)?;
        }
        Ok(())
    }

    pub async fn batches<W: Write>(&self, item_id: &str, out: &mut W) -> Result<()> {
        let batches = self.session.batches().load(&LookupId::new(item_id)).await;
        if batches.is_empty() {
            writeln!(out, "no batches for {item_id}")?;
        }
        for batch in batches {
            writeln!(out, "{batch}")?;
        }
        Ok(())
    }

    pub async fn orders<W: Write>(
        &mut self,
        term: Option<&str>,
        document_type: Option<DocumentType>,
        page: usize,
        out: &mut W,
    ) -> Result<()> {
        let query = OrdersQuery {
            page,
            search: term.map(str::to_owned),
            document_type,
            ..OrdersQuery::default()
        };
        let listing = match self.client.list_orders(&query).await {
            Ok(listing) => listing,
            Err(error) => return Err(self.record_failure(error)),
        };

        let shown = match term {
            Some(term) => filter_orders(&listing.orders, term),
            None => listing.orders.iter().collect(),
        };
        if shown.is_empty() {
            writeln!(out, "no orders found")?;
        }
        for order in &shown {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}",
                order.display_number(),
                order.order_date,
                order.document_type().order_type(),
                order.party_name(),
                order.status,
                order
                    .total_amount
                    .map(|total| format!("{total:.2}"))
                    .unwrap_or_default(),
            )?;
        }

        if let Some(meta) = listing.pagination {
            let mut pages = Pagination::new(meta.total_items, meta.items_per_page);
            pages.set_page(meta.current_page);
            let strip = pages
                .window()
                .into_iter()
                .map(|number| {
                    if number == pages.current() {
                        format!("[{number}]")
                    } else {
                        number.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}  pages: {strip}", pages.showing())?;
        }
        Ok(())
    }

    pub async fn payment_status<W: Write>(
        &mut self,
        number: &str,
        status: PaymentStatus,
        amount: Option<f64>,
        out: &mut W,
    ) -> Result<()> {
        if let Err(error) = self
            .client
            .update_payment_status(number, status, amount)
            .await
        {
            return Err(self.record_failure(error));
        }

        let message = format!("{number} is now {}", status.as_str());
        self.notifications.add(
            NotificationKind::Success,
            "Payment updated",
            &message,
            OffsetDateTime::now_utc(),
        );
        writeln!(out, "{message}")?;
        Ok(())
    }

    pub async fn show_notifications<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let logs = match self.client.recent_logs().await {
            Ok(logs) => logs,
            Err(error) => return Err(self.record_failure(error)),
        };
        self.notifications
            .seed_from_logs(logs, OffsetDateTime::now_utc());

        if self.notifications.entries().is_empty() {
            writeln!(out, "no notifications")?;
            return Ok(());
        }
        for entry in self.notifications.entries() {
            writeln!(
                out,
                "[{}] {}: {}",
                entry.kind.as_str(),
                entry.title,
                entry.message
            )?;
        }
        writeln!(out, "{} unread", self.notifications.unread_count())?;
        Ok(())
    }

    fn record_failure(&mut self, error: anyhow::Error) -> anyhow::Error {
        self.notifications
            .error(&format!("{error:#}"), OffsetDateTime::now_utc());
        error
    }
}

fn write_item<W: Write>(out: &mut W, endpoint: LookupEndpoint, item: &LookupItem) -> Result<()> {
    if endpoint == LookupEndpoint::Inventory {
        writeln!(
            out,
            "{}\t{}\t{:.2}\t{}%",
            item.id,
            item.name,
            item.rate().unwrap_or(0.0),
            item.tax_percent().unwrap_or(0.0)
        )?;
    } else {
        writeln!(out, "{}\t{}", item.id, item.name)?;
    }
    Ok(())
}

fn write_quote<W: Write>(quote: &QuoteArgs, out: &mut W) -> Result<()> {
    let draft = quote_draft(quote)?;
    for (index, line) in draft.lines.iter().enumerate() {
        writeln!(
            out,
            "{}. {} x {:.2} + {}% tax = {:.2}",
            index + 1,
            line.quantity,
            line.rate,
            line.tax_percent,
            line.amount()
        )?;
    }

    let summary = draft.summary();
    writeln!(out, "subtotal\t{:.2}", summary.subtotal)?;
    writeln!(out, "discount\t{:.2}", summary.discount_amount)?;
    writeln!(out, "tax\t{:.2}", summary.total_tax)?;
    writeln!(out, "grand total\t{:.2}", summary.grand_total)?;
    Ok(())
}

pub(crate) fn quote_draft(quote: &QuoteArgs) -> Result<OrderDraft> {
    if quote.lines.is_empty() {
        bail!("quote needs at least one --item <rate>:<qty>:<tax>");
    }

    let mut draft = OrderDraft::new(
        DocumentType::SalesInvoice,
        OffsetDateTime::now_utc().date(),
    );
    for (index, entry) in quote.lines.iter().enumerate() {
        let row = if index == 0 {
            draft.rows()[0]
        } else {
            draft.add_line()
        };
        if let Some(line) = draft.line_mut(row) {
            line.set_rate(Some(entry.rate));
            line.set_quantity(i64::from(entry.quantity));
            line.set_tax_percent(Some(entry.tax_percent));
        }
    }
    draft.discount = quote.discount;
    draft.discount_type = if quote.flat {
        DiscountType::Amount
    } else {
        DiscountType::Percentage
    };
    Ok(draft)
}

fn chat<W: Write>(config: &Config, message: &str, out: &mut W) -> Result<()> {
    if !config.assistant_enabled() {
        bail!("the assistant is disabled; set assistant.enabled = true in the config");
    }

    let client = AssistantClient::new(&config.api_base_url(), config.assistant_timeout()?)?;
    let mut conversation = Conversation::default();
    let mut streamed = Ok(());
    conversation.send(&client, message, |chunk| {
        if streamed.is_ok() {
            streamed = write!(out, "{chunk}").and_then(|()| out.flush());
        }
    })?;
    streamed.context("write assistant reply")?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ApiRuntime, execute, quote_draft};
    use crate::config::Config;
    use crate::{Command, QuoteArgs, QuoteLine};
    use anyhow::{Result, anyhow};
    use bizsuite_app::{LookupEndpoint, NotificationKind, PaymentStatus};
    use std::thread;
    use tiny_http::{Header, Response, Server};

    fn json_response(status: u16, body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
        Response::from_string(body)
            .with_status_code(status)
            .with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            )
    }

    fn config_for(addr: &str) -> Result<(tempfile::TempDir, Config)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            format!("version = 1\n[api]\nbase_url = \"{addr}\"\ntimeout = \"2s\"\n"),
        )?;
        let config = Config::load(&path)?;
        Ok((temp, config))
    }

    fn mock_server() -> Result<(Server, String)> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        Ok((server, addr))
    }

    #[test]
    fn quote_matches_the_worked_totals() -> Result<()> {
        let quote = QuoteArgs {
            lines: vec![QuoteLine {
                rate: 100.0,
                quantity: 3,
                tax_percent: 18.0,
            }],
            discount: 0.0,
            flat: false,
        };
        let draft = quote_draft(&quote)?;
        assert!((draft.lines[0].amount() - 354.0).abs() < 1e-9);

        let mut out = Vec::new();
        execute(&Config::default(), &Command::Quote(quote), &mut out)?;
        let text = String::from_utf8(out)?;
        assert!(text.contains("grand total\t354.00"), "got {text}");
        Ok(())
    }

    #[test]
    fn quote_applies_percentage_or_flat_discount() -> Result<()> {
        let mut quote = QuoteArgs {
            lines: vec![
                QuoteLine {
                    rate: 500.0,
                    quantity: 1,
                    tax_percent: 5.0,
                },
                QuoteLine {
                    rate: 250.0,
                    quantity: 2,
                    tax_percent: 5.0,
                },
            ],
            discount: 10.0,
            flat: false,
        };
        let summary = quote_draft(&quote)?.summary();
        assert!((summary.subtotal - 1000.0).abs() < 1e-9);
        assert!((summary.discount_amount - 100.0).abs() < 1e-9);
        assert!((summary.grand_total - 950.0).abs() < 1e-9);

        quote.flat = true;
        let summary = quote_draft(&quote)?.summary();
        assert!((summary.discount_amount - 10.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn quote_without_lines_is_rejected() {
        let quote = QuoteArgs {
            lines: Vec::new(),
            discount: 0.0,
            flat: false,
        };
        assert!(quote_draft(&quote).is_err());
    }

    #[test]
    fn lookup_command_prints_merged_search_results() -> Result<()> {
        let (server, addr) = mock_server()?;
        let handle = thread::spawn(move || {
            let request = server.recv().expect("bulk request expected");
            assert_eq!(request.url(), "/api/v1/dropdown/clients?limit=100");
            request
                .respond(json_response(
                    200,
                    r#"{"items":[{"id":"c1","name":"City Hospital"},{"id":"c2","name":"Metro Clinic"}]}"#,
                ))
                .expect("response should succeed");

            let request = server.recv().expect("search request expected");
            assert_eq!(
                request.url(),
                "/api/v1/dropdown/clients?search_prefix=city&limit=10"
            );
            request
                .respond(json_response(
                    200,
                    r#"{"items":[{"id":"c1","name":"City Hospital"},{"id":"c9","name":"City Care Labs"}]}"#,
                ))
                .expect("response should succeed");
        });

        let (_temp, config) = config_for(&addr)?;
        let mut out = Vec::new();
        execute(
            &config,
            &Command::Lookup {
                endpoint: LookupEndpoint::Clients,
                term: Some("city".to_owned()),
            },
            &mut out,
        )?;
        assert_eq!(
            String::from_utf8(out)?,
            "c1\tCity Hospital\nc9\tCity Care Labs\n"
        );

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn orders_command_prints_rows_and_page_strip() -> Result<()> {
        let (server, addr) = mock_server()?;
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/api/v1/orders?page=1&limit=10");
            request
                .respond(json_response(
                    200,
                    r#"{"orders":[{"invoice_number":"INV-1","client_name":"City Hospital","order_type":"sale","order_date":"2025-01-15","status":"paid","total_amount":354}],
                        "pagination":{"current_page":1,"total_pages":2,"total_items":11,"items_per_page":10,"has_next":true,"has_prev":false}}"#,
                ))
                .expect("response should succeed");
        });

        let (_temp, config) = config_for(&addr)?;
        let mut out = Vec::new();
        execute(
            &config,
            &Command::Orders {
                term: None,
                document_type: None,
                page: 1,
            },
            &mut out,
        )?;
        assert_eq!(
            String::from_utf8(out)?,
            "INV-1\t2025-01-15\tsale\tCity Hospital\tpaid\t354.00\nShowing 1 to 10 of 11  pages: [1] 2\n"
        );

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn failed_payment_update_lands_in_the_notification_feed() -> Result<()> {
        let (server, addr) = mock_server()?;
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            request
                .respond(json_response(404, r#"{"detail":"Order not found"}"#))
                .expect("response should succeed");
        });

        let (_temp, config) = config_for(&addr)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let mut api = ApiRuntime::new(&config)?;
        let mut out = Vec::new();
        let result = runtime.block_on(api.payment_status(
            "INV-404",
            PaymentStatus::Paid,
            None,
            &mut out,
        ));

        let error = result.expect_err("404 should fail");
        assert_eq!(error.to_string(), "server error (404): Order not found");
        let entries = api.notifications().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, NotificationKind::Error);
        assert_eq!(entries[0].message, "server error (404): Order not found");

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn notifications_command_lists_backend_logs_newest_first() -> Result<()> {
        let (server, addr) = mock_server()?;
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            request
                .respond(json_response(
                    200,
                    r#"{"logs":[{"message":"order INV-1 created"},{"message":"stock low: Needles"}]}"#,
                ))
                .expect("response should succeed");
        });

        let (_temp, config) = config_for(&addr)?;
        let mut out = Vec::new();
        execute(&config, &Command::Notifications, &mut out)?;
        assert_eq!(
            String::from_utf8(out)?,
            "[info] System Log: stock low: Needles\n[info] System Log: order INV-1 created\n2 unread\n"
        );

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn disabled_assistant_refuses_to_chat() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "version = 1\n[assistant]\nenabled = false\n")?;
        let config = Config::load(&path)?;

        let mut out = Vec::new();
        let error = execute(
            &config,
            &Command::Chat {
                message: "hello".to_owned(),
            },
            &mut out,
        )
        .expect_err("disabled assistant should fail");
        assert!(error.to_string().contains("assistant is disabled"));
        Ok(())
    }
}

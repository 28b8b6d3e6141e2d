use crate::ui;
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use gamble_sui::{
    Error as ChainError,
    Result as ChainResult,
    actions::{
        ChainActions,
        MAX_TICKETS_PER_PURCHASE,
        PurchaseBatch,
    },
    address::SuiAddress,
    admin::{
        AdminDesk,
        AdminStats,
        RowStatus,
        StopMark,
    },
    chain::{
        ChainReader,
        ContractConfig,
    },
    deployment::DeploymentEnv,
    format,
    gateway::{
        ChainQuery,
        GraphQlClient,
    },
    pools::{
        COUNTDOWN_PERIOD,
        CountdownTicker,
        Pool,
        PoolBoard,
        RefreshOutcome,
        RefreshToken,
        demo_pools,
    },
    signer::{
        ExecutionResult,
        SuiCliSigner,
        TransactionSigner,
    },
    tickets::{
        Aggregates,
        ChainTicket,
        StatusFilter,
        Ticket,
        TicketBook,
        raw_to_quote,
    },
};
use std::{
    future::Future,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
    warn,
};

const MAX_ERRORS: usize = 50;
const LOADING_STATUS: &str = "Loading pools...";

pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Screen {
    #[default]
    Tickets,
    Admin,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub env: DeploymentEnv,
    pub graphql_url: String,
    pub contract: ContractConfig,
    pub sui_bin: PathBuf,
    pub gas_budget: u64,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub demo: bool,
    pub start_screen: Screen,
}

#[derive(Clone, Debug)]
pub struct AdminRowView {
    pub pool: Pool,
    pub status: RowStatus,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub screen: Screen,
    pub network: String,
    pub demo: bool,
    pub account: Option<SuiAddress>,
    pub now: u64,
    pub pools: Vec<Pool>,
    pub selected_pool: Option<Pool>,
    /// Local purchases added to the selected pool's pot since the last refresh.
    pub pot_delta: Option<u64>,
    pub pools_loading: bool,
    pub pools_error: Option<String>,
    pub tickets: Vec<Ticket>,
    pub ticket_filter: StatusFilter,
    pub ticket_stats: Aggregates,
    pub admin_rows: Vec<AdminRowView>,
    pub admin_stats: AdminStats,
    pub admin_loading: bool,
    pub admin_error: Option<String>,
    pub status: String,
    pub errors: Vec<String>,
}

/// A validated buy request, captured before the signer is involved.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseRequest {
    pub pool: Pool,
    pub quote_raw: u64,
    pub quantity: u64,
}

pub struct AppController {
    network: String,
    demo: bool,
    screen: Screen,
    account: Option<SuiAddress>,
    board: PoolBoard,
    book: TicketBook,
    desk: AdminDesk,
    tickets_loading: bool,
    status: String,
    errors: Vec<String>,
}

impl AppController {
    pub fn new(config: &AppConfig, now: u64) -> Self {
        let network = if config.demo {
            format!("{} (demo)", config.env)
        } else {
            format!("{} ({})", config.env, config.graphql_url)
        };
        let mut controller = Self {
            network,
            demo: config.demo,
            screen: config.start_screen,
            account: None,
            board: PoolBoard::new(),
            book: TicketBook::new(),
            desk: AdminDesk::new(),
            tickets_loading: false,
            status: String::new(),
            errors: Vec::new(),
        };
        if config.demo {
            controller.load_demo(now);
            controller.set_status("Demo mode: pools and tickets are generated locally");
        } else {
            controller.set_status(LOADING_STATUS);
        }
        controller
    }

    fn load_demo(&mut self, now: u64) {
        let token = self.board.begin_refresh();
        self.board.apply_refresh(token, Ok(demo_pools(now)), now);
        let token = self.desk.begin_listing();
        self.desk.apply_listing(token, Ok(demo_pools(now)));
        self.book.reset_demo(now);
    }

    pub fn is_demo(&self) -> bool {
        self.demo
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        info!(status = %self.status, "status updated");
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.push_errors(vec![message.into()]);
    }

    pub fn switch_screen(&mut self) -> Screen {
        self.screen = match self.screen {
            Screen::Tickets => Screen::Admin,
            Screen::Admin => Screen::Tickets,
        };
        self.screen
    }

    pub fn reset_demo(&mut self, now: u64) {
        if !self.demo {
            self.push_error("Demo data can only be reset in demo mode");
            return;
        }
        self.load_demo(now);
        self.set_status("Demo data reset");
    }

    pub fn select_next_pool(&mut self, now: u64) {
        self.step_selection(now, true);
    }

    pub fn select_prev_pool(&mut self, now: u64) {
        self.step_selection(now, false);
    }

    /// Moves through open pools only, wrapping at either end.
    fn step_selection(&mut self, now: u64, forward: bool) {
        let open: Vec<String> = self
            .board
            .pools()
            .iter()
            .filter(|pool| !pool.is_expired(now))
            .map(|pool| pool.id.clone())
            .collect();
        if open.is_empty() {
            self.set_status("No open rounds to select");
            return;
        }
        let current = self
            .board
            .selected_id()
            .and_then(|id| open.iter().position(|candidate| candidate == id));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => open.len() - 1,
            (Some(i), true) => (i + 1) % open.len(),
            (Some(i), false) => (i + open.len() - 1) % open.len(),
        };
        self.board.select(&open[next], now);
    }

    pub fn tick(&mut self, now: u64) {
        if self.board.tick(now) {
            self.set_status("Selected round expired");
        }
    }

    /// `None` while the previous pool fetch is still outstanding, so a slow
    /// endpoint is never outrun by the poll timer.
    pub fn begin_pool_refresh(&mut self) -> Option<RefreshToken> {
        if self.board.is_loading() {
            return None;
        }
        Some(self.board.begin_refresh())
    }

    pub fn apply_pools(&mut self, token: RefreshToken, result: ChainResult<Vec<Pool>>, now: u64) {
        let outcome = self.board.apply_refresh(token, result, now);
        if outcome == RefreshOutcome::Applied && self.status == LOADING_STATUS {
            self.set_status(format!("Loaded {} pools", self.board.pools().len()));
        }
    }

    pub fn begin_admin_listing(&mut self) -> Option<RefreshToken> {
        if self.desk.is_loading() {
            return None;
        }
        Some(self.desk.begin_listing())
    }

    /// Owner to fetch tickets for, unless no account is known or a fetch is
    /// already outstanding.
    pub fn begin_ticket_fetch(&mut self) -> Option<SuiAddress> {
        if self.tickets_loading {
            return None;
        }
        let owner = self.account?;
        self.tickets_loading = true;
        Some(owner)
    }

    pub fn apply_admin_listing(&mut self, token: RefreshToken, result: ChainResult<Vec<Pool>>) {
        self.desk.apply_listing(token, result);
    }

    pub fn set_account(&mut self, result: ChainResult<SuiAddress>) -> Option<SuiAddress> {
        match result {
            Ok(address) => {
                info!(%address, "active signer address");
                self.account = Some(address);
            }
            Err(err) => self.push_error(format!("Could not read the signer address: {err}")),
        }
        self.account
    }

    pub fn apply_tickets(&mut self, result: ChainResult<Vec<ChainTicket>>, now: u64) {
        self.tickets_loading = false;
        match result {
            Ok(chain) => {
                let pools = self.board.pools();
                let tickets = chain
                    .into_iter()
                    .map(|ticket| ticket.into_ticket(pools, now))
                    .collect();
                self.book.reconcile(tickets);
            }
            Err(err) => self.push_error(format!("Failed to load tickets: {err}")),
        }
    }

    pub fn cycle_filter(&mut self) {
        let next = self.book.current_filter().next();
        self.book.set_filter(next);
    }

    pub fn prepare_purchase(
        &self,
        quote_input: &str,
        quantity_input: &str,
        now: u64,
    ) -> ChainResult<PurchaseRequest> {
        let pool = self
            .board
            .selected()
            .ok_or_else(|| ChainError::invalid_input("Select an open round first"))?;
        if pool.is_expired(now) {
            return Err(ChainError::invalid_input(format!("{} has expired", pool.name)));
        }
        let quote_raw = format::parse_quote(quote_input)?;
        let quantity = match quantity_input.trim().parse::<u64>() {
            Ok(quantity) if (1..=MAX_TICKETS_PER_PURCHASE).contains(&quantity) => quantity,
            _ => {
                return Err(ChainError::invalid_input(format!(
                    "Quantity must be a whole number from 1 to {MAX_TICKETS_PER_PURCHASE}"
                )));
            }
        };
        Ok(PurchaseRequest {
            pool: pool.clone(),
            quote_raw,
            quantity,
        })
    }

    /// Provisional tickets plus a local pot credit for `ticket_ids.len()` tickets.
    fn record_purchase(
        &mut self,
        request: &PurchaseRequest,
        ticket_ids: &[Option<SuiAddress>],
        now: u64,
    ) {
        if ticket_ids.is_empty() {
            return;
        }
        let quote = raw_to_quote(request.quote_raw);
        let price = request.pool.ticket_price_mist;
        for chain_id in ticket_ids {
            let ticket = self.book.record_purchase(&request.pool.id, quote, price, now);
            if let Some(id) = chain_id {
                ticket.id = id.to_string();
            }
        }
        let count = u64::try_from(ticket_ids.len()).unwrap_or(u64::MAX);
        self.board.credit_pot(&request.pool.id, price.saturating_mul(count));
        self.set_status(format!(
            "{} ticket(s) placed on {} at {}",
            count,
            request.pool.name,
            format::format_quote(quote)
        ));
    }

    /// Local-only purchase for demo mode.
    pub fn record_demo_purchase(&mut self, request: &PurchaseRequest, now: u64) {
        let ids = vec![None; usize::try_from(request.quantity).unwrap_or(0)];
        self.record_purchase(request, &ids, now);
    }

    pub fn apply_purchase(&mut self, request: &PurchaseRequest, batch: PurchaseBatch, now: u64) {
        for receipt in &batch.receipts {
            info!(digest = %receipt.execution.digest, pool = %request.pool.id, "ticket purchased");
        }
        let ids: Vec<Option<SuiAddress>> =
            batch.receipts.iter().map(|receipt| receipt.ticket).collect();
        self.record_purchase(request, &ids, now);
        if let Some(err) = batch.failure {
            let bought = batch.receipts.len();
            if bought == 0 {
                self.push_error(format!("Ticket purchase failed: {err}"));
            } else {
                self.push_error(format!(
                    "Ticket purchase stopped after {bought} of {}: {err}",
                    request.quantity
                ));
            }
        }
    }

    fn refuse_in_demo(&self, action: &str) -> ChainResult<()> {
        if self.demo {
            return Err(ChainError::invalid_input(format!(
                "{action} needs a chain connection; restart without --demo"
            )));
        }
        Ok(())
    }

    pub fn prepare_start(&self, price_input: &str) -> ChainResult<u64> {
        self.refuse_in_demo("Starting a game")?;
        format::parse_sui_amount(price_input)
    }

    pub fn apply_start(&mut self, price_mist: u64, result: ChainResult<ExecutionResult>) {
        match result {
            Ok(execution) => self.set_status(format!(
                "New round opened at {} per ticket ({})",
                format::format_sui(price_mist),
                execution.digest
            )),
            Err(err) => self.push_error(format!("Start game failed: {err}")),
        }
    }

    /// Marks the pool as stopping; refused while a stop for it is pending.
    pub fn request_stop(&mut self, pool_id: &str) -> ChainResult<()> {
        self.refuse_in_demo("Stopping a pool")?;
        match self.desk.stop_mark(pool_id) {
            Some(StopMark::Pending) => {
                return Err(ChainError::ActionInFlight(format!("stop of pool {pool_id}")));
            }
            Some(StopMark::Stopped) => {
                return Err(ChainError::invalid_input(format!("{pool_id} is already stopped")));
            }
            None => {}
        }
        if !self.desk.mark_stop_pending(pool_id) {
            return Err(ChainError::invalid_input(format!("Unknown pool {pool_id}")));
        }
        self.set_status(format!("Stopping {}...", format::short_address(pool_id)));
        Ok(())
    }

    pub fn apply_stop(&mut self, pool_id: &str, result: ChainResult<ExecutionResult>) {
        match result {
            Ok(execution) => {
                self.desk.confirm_stop(pool_id);
                self.set_status(format!(
                    "Stopped {} ({})",
                    format::short_address(pool_id),
                    execution.digest
                ));
            }
            Err(err) => {
                self.desk.revert_stop(pool_id);
                self.push_error(format!("Stop pool failed: {err}"));
            }
        }
    }

    /// `0x`-prefixed input is hex, anything else is taken as UTF-8 bytes.
    pub fn prepare_oracle_setting(&self, input: &str) -> ChainResult<Vec<u8>> {
        self.refuse_in_demo("Configuring the oracle")?;
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ChainError::invalid_input("Oracle id must not be empty"));
        }
        match raw.strip_prefix("0x") {
            Some(digits) => hex::decode(digits)
                .map_err(|err| ChainError::invalid_input(format!("Invalid hex oracle id: {err}"))),
            None => Ok(raw.as_bytes().to_vec()),
        }
    }

    pub fn apply_oracle_setting(&mut self, result: ChainResult<ExecutionResult>) {
        match result {
            Ok(execution) => self.set_status(format!("Oracle setting created ({})", execution.digest)),
            Err(err) => self.push_error(format!("Oracle setting failed: {err}")),
        }
    }

    pub fn snapshot(&self, now: u64) -> AppSnapshot {
        AppSnapshot {
            screen: self.screen,
            network: self.network.clone(),
            demo: self.demo,
            account: self.account,
            now,
            pools: self.board.pools().to_vec(),
            selected_pool: self.board.selected().cloned(),
            pot_delta: self
                .board
                .selected_id()
                .and_then(|id| self.board.pot_credit(id)),
            pools_loading: self.board.is_loading(),
            pools_error: self.board.error().map(str::to_string),
            tickets: self.book.visible().into_iter().cloned().collect(),
            ticket_filter: self.book.current_filter(),
            ticket_stats: self.book.aggregates(),
            admin_rows: self
                .desk
                .rows(now)
                .into_iter()
                .map(|row| AdminRowView {
                    pool: row.pool.clone(),
                    status: row.status,
                })
                .collect(),
            admin_stats: self.desk.stats(now),
            admin_loading: self.desk.is_loading(),
            admin_error: self.desk.error().map(str::to_string),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }
}

struct ChainBackend<G, S> {
    reader: Arc<ChainReader<G>>,
    actions: ChainActions<G, S>,
}

enum ChainCommand {
    RefreshPools(RefreshToken),
    ListAdmin(RefreshToken),
    FetchTickets(SuiAddress),
    Shutdown,
}

enum ChainEvent {
    Pools(RefreshToken, ChainResult<Vec<Pool>>),
    AdminListing(RefreshToken, ChainResult<Vec<Pool>>),
    Tickets(ChainResult<Vec<ChainTicket>>),
}

enum ActionEvent {
    Account(ChainResult<SuiAddress>),
    Purchased {
        request: PurchaseRequest,
        batch: PurchaseBatch,
    },
    Started {
        price_mist: u64,
        result: ChainResult<ExecutionResult>,
    },
    Stopped {
        pool_id: String,
        result: ChainResult<ExecutionResult>,
    },
    OracleConfigured(ChainResult<ExecutionResult>),
}

/// Serves chain reads one at a time so the UI loop never awaits the network.
async fn chain_worker<G: ChainQuery>(
    reader: Arc<ChainReader<G>>,
    mut cmd_rx: mpsc::UnboundedReceiver<ChainCommand>,
    event_tx: mpsc::UnboundedSender<ChainEvent>,
) -> Result<()> {
    while let Some(cmd) = cmd_rx.recv().await {
        let event = match cmd {
            ChainCommand::RefreshPools(token) => ChainEvent::Pools(token, reader.fetch_pools().await),
            ChainCommand::ListAdmin(token) => {
                ChainEvent::AdminListing(token, reader.fetch_pools_with_creators().await)
            }
            ChainCommand::FetchTickets(owner) => ChainEvent::Tickets(reader.fetch_tickets(owner).await),
            ChainCommand::Shutdown => break,
        };
        event_tx
            .send(event)
            .map_err(|_| eyre!("chain event receiver dropped"))?;
    }
    Ok(())
}

fn request_refresh(
    controller: &mut AppController,
    cmd_tx: &mpsc::UnboundedSender<ChainCommand>,
) {
    if controller.is_demo() {
        return;
    }
    if let Some(token) = controller.begin_pool_refresh() {
        let _ = cmd_tx.send(ChainCommand::RefreshPools(token));
    }
    if controller.screen() == Screen::Admin {
        if let Some(token) = controller.begin_admin_listing() {
            let _ = cmd_tx.send(ChainCommand::ListAdmin(token));
        }
    }
    if let Some(owner) = controller.begin_ticket_fetch() {
        let _ = cmd_tx.send(ChainCommand::FetchTickets(owner));
    }
}

fn spawn_action<F>(action_tx: &mpsc::UnboundedSender<ActionEvent>, action: F)
where
    F: Future<Output = ActionEvent> + Send + 'static,
{
    let action_tx = action_tx.clone();
    tokio::spawn(async move {
        let _ = action_tx.send(action.await);
    });
}

fn redraw(
    controller: &AppController,
    ui_state: &mut ui::UiState,
    context: &'static str,
) -> Result<()> {
    let snapshot = controller.snapshot(now_ms());
    ui::draw(ui_state, &snapshot).wrap_err(context)
}

fn show_processing_status(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    message: impl Into<String>,
    context: &'static str,
) -> Result<()> {
    controller.set_status(message);
    redraw(controller, ui_state, context)
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let controller = AppController::new(&config, now_ms());
    let backend = if config.demo {
        None
    } else {
        let gateway = GraphQlClient::new(config.graphql_url.clone(), config.request_timeout)
            .wrap_err("building GraphQL client failed")?;
        let reader = Arc::new(ChainReader::new(gateway, config.contract.clone()));
        let signer = Arc::new(SuiCliSigner::new(config.sui_bin.clone(), config.gas_budget));
        Some(ChainBackend {
            actions: ChainActions::new(Arc::clone(&reader), signer),
            reader,
        })
    };
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!(network = %config.env, demo = config.demo, "Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        controller,
        backend,
        config.poll_interval,
        &mut ui_state,
        &mut input_events,
    )
    .await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<G, S>(
    mut controller: AppController,
    backend: Option<ChainBackend<G, S>>,
    poll_interval: Duration,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()>
where
    G: ChainQuery + Send + Sync + 'static,
    S: TransactionSigner + Send + Sync + 'static,
{
    tracing::info!("Running app loop");
    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let ticker = CountdownTicker::spawn(COUNTDOWN_PERIOD, tick_tx);
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (chain_tx, mut chain_rx) = mpsc::unbounded_channel();

    let worker = backend
        .as_ref()
        .map(|backend| tokio::spawn(chain_worker(Arc::clone(&backend.reader), cmd_rx, chain_tx)));
    let mut chain_open = worker.is_some();

    if let Some(backend) = &backend {
        let actions = backend.actions.clone();
        spawn_action(&action_tx, async move {
            ActionEvent::Account(actions.active_address().await)
        });
    }

    let mut poll = time::interval(poll_interval);
    redraw(&controller, ui_state, "initial draw failed")?;

    loop {
        tokio::select! {
            Some(()) = tick_rx.recv() => {
                controller.tick(now_ms());
                redraw(&controller, ui_state, "draw after countdown tick failed")?;
            }
            _ = poll.tick(), if chain_open => {
                request_refresh(&mut controller, &cmd_tx);
            }
            maybe_event = chain_rx.recv(), if chain_open => {
                match maybe_event {
                    Some(ChainEvent::Pools(token, result)) => {
                        controller.apply_pools(token, result, now_ms());
                    }
                    Some(ChainEvent::AdminListing(token, result)) => {
                        controller.apply_admin_listing(token, result);
                    }
                    Some(ChainEvent::Tickets(result)) => {
                        controller.apply_tickets(result, now_ms());
                    }
                    None => {
                        warn!("chain worker channel closed");
                        controller.push_error("Chain worker stopped; data will no longer refresh");
                        chain_open = false;
                    }
                }
                redraw(&controller, ui_state, "draw after chain update failed")?;
            }
            Some(event) = action_rx.recv() => {
                let now = now_ms();
                match event {
                    ActionEvent::Account(result) => {
                        if controller.set_account(result).is_some() {
                            if let Some(owner) = controller.begin_ticket_fetch() {
                                let _ = cmd_tx.send(ChainCommand::FetchTickets(owner));
                            }
                        }
                    }
                    ActionEvent::Purchased { request, batch } => {
                        controller.apply_purchase(&request, batch, now);
                        request_refresh(&mut controller, &cmd_tx);
                    }
                    ActionEvent::Started { price_mist, result } => {
                        controller.apply_start(price_mist, result);
                        request_refresh(&mut controller, &cmd_tx);
                    }
                    ActionEvent::Stopped { pool_id, result } => {
                        controller.apply_stop(&pool_id, result);
                        request_refresh(&mut controller, &cmd_tx);
                    }
                    ActionEvent::OracleConfigured(result) => {
                        controller.apply_oracle_setting(result);
                    }
                }
                redraw(&controller, ui_state, "draw after action failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                let now = now_ms();
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Hint(message) => controller.set_status(message),
                    ui::UserEvent::SwitchScreen => {
                        if controller.switch_screen() == Screen::Admin && !controller.is_demo() {
                            if let Some(token) = controller.begin_admin_listing() {
                                let _ = cmd_tx.send(ChainCommand::ListAdmin(token));
                            }
                        }
                    }
                    ui::UserEvent::NextPool => controller.select_next_pool(now),
                    ui::UserEvent::PrevPool => controller.select_prev_pool(now),
                    ui::UserEvent::CycleFilter => controller.cycle_filter(),
                    ui::UserEvent::ResetDemo => controller.reset_demo(now),
                    ui::UserEvent::Refresh => {
                        if controller.is_demo() {
                            controller.set_status("Demo data is local; press d to reset it");
                        } else {
                            request_refresh(&mut controller, &cmd_tx);
                            controller.set_status("Refreshing...");
                        }
                    }
                    ui::UserEvent::ConfirmBuy { quote, quantity } => {
                        match controller.prepare_purchase(&quote, &quantity, now) {
                            Err(err) => controller.push_error(format!("Ticket purchase failed: {err}")),
                            Ok(request) => match &backend {
                                None => controller.record_demo_purchase(&request, now),
                                Some(backend) => {
                                    show_processing_status(
                                        &mut controller,
                                        ui_state,
                                        format!(
                                            "Buying {} ticket(s) on {}...",
                                            request.quantity, request.pool.name
                                        ),
                                        "draw while submitting purchase failed",
                                    )?;
                                    let actions = backend.actions.clone();
                                    spawn_action(&action_tx, async move {
                                        let batch = actions
                                            .buy_tickets(
                                                &request.pool,
                                                request.quote_raw,
                                                request.quantity,
                                                now,
                                            )
                                            .await;
                                        ActionEvent::Purchased { request, batch }
                                    });
                                }
                            },
                        }
                    }
                    ui::UserEvent::ConfirmStart { price } => {
                        match (controller.prepare_start(&price), &backend) {
                            (Err(err), _) => controller.push_error(format!("Start game failed: {err}")),
                            (Ok(_), None) => controller.push_error("Start game failed: no chain connection"),
                            (Ok(price_mist), Some(backend)) => {
                                show_processing_status(
                                    &mut controller,
                                    ui_state,
                                    "Starting a new round...",
                                    "draw while starting game failed",
                                )?;
                                let actions = backend.actions.clone();
                                spawn_action(&action_tx, async move {
                                    let result = actions.start_game(price_mist).await;
                                    ActionEvent::Started { price_mist, result }
                                });
                            }
                        }
                    }
                    ui::UserEvent::ConfirmStop { pool_id } => {
                        match (controller.request_stop(&pool_id), &backend) {
                            (Err(err), _) => controller.push_error(format!("Stop pool failed: {err}")),
                            (Ok(()), None) => {
                                controller.apply_stop(&pool_id, Err(ChainError::invalid_input("no chain connection")));
                            }
                            (Ok(()), Some(backend)) => {
                                let actions = backend.actions.clone();
                                spawn_action(&action_tx, async move {
                                    let result = actions.stop_pool(&pool_id).await;
                                    ActionEvent::Stopped { pool_id, result }
                                });
                            }
                        }
                    }
                    ui::UserEvent::ConfigureOracle { oracle_id } => {
                        match (controller.prepare_oracle_setting(&oracle_id), &backend) {
                            (Err(err), _) => controller.push_error(format!("Oracle setting failed: {err}")),
                            (Ok(_), None) => controller.push_error("Oracle setting failed: no chain connection"),
                            (Ok(bytes), Some(backend)) => {
                                show_processing_status(
                                    &mut controller,
                                    ui_state,
                                    "Creating oracle setting...",
                                    "draw while configuring oracle failed",
                                )?;
                                let actions = backend.actions.clone();
                                spawn_action(&action_tx, async move {
                                    ActionEvent::OracleConfigured(
                                        actions.create_oracle_setting(&bytes).await,
                                    )
                                });
                            }
                        }
                    }
                }
                redraw(&controller, ui_state, "draw after input failed")?;
            }
        }
    }

    let _ = cmd_tx.send(ChainCommand::Shutdown);
    ticker.dispose();
    if let Some(worker) = worker {
        worker.abort();
    }
    Ok(())
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use gamble_sui::{
        actions::PurchaseReceipt,
        pools::MIST_PER_SUI,
        signer::ExecutionResult,
        tickets::TicketStatus,
    };

    const T: u64 = 1_700_000_000_000;

    fn config(demo: bool) -> AppConfig {
        AppConfig {
            env: DeploymentEnv::Test,
            graphql_url: "http://127.0.0.1:1/graphql".to_string(),
            contract: ContractConfig::new("0xbeef".parse().unwrap()),
            sui_bin: PathBuf::from("sui"),
            gas_budget: 1,
            request_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
            demo,
            start_screen: Screen::Tickets,
        }
    }

    fn pool(id: &str, expires_at: u64) -> Pool {
        Pool {
            id: id.to_string(),
            name: gamble_sui::pools::round_name(id),
            created_at: expires_at.saturating_sub(100_000),
            expires_at,
            pot_mist: MIST_PER_SUI,
            ticket_price_mist: MIST_PER_SUI,
            creator: None,
            defaulted: Vec::new(),
        }
    }

    fn executed() -> ExecutionResult {
        ExecutionResult {
            digest: "digest-1".to_string(),
            object_changes: Vec::new(),
        }
    }

    fn live_with(pools: Vec<Pool>) -> AppController {
        let mut controller = AppController::new(&config(false), T);
        let token = controller.begin_pool_refresh().unwrap();
        controller.apply_pools(token, Ok(pools.clone()), T);
        let token = controller.begin_admin_listing().unwrap();
        controller.apply_admin_listing(token, Ok(pools));
        controller
    }

    fn receipt(ticket: Option<&str>) -> PurchaseReceipt {
        PurchaseReceipt {
            execution: executed(),
            coin: "0xc1".parse().unwrap(),
            stake_mist: MIST_PER_SUI,
            ticket: ticket.map(|id| id.parse().unwrap()),
        }
    }

    #[test]
    fn new__demo__loads_local_pools_and_tickets() {
        // when
        let controller = AppController::new(&config(true), T);

        // then
        let snapshot = controller.snapshot(T);
        assert!(snapshot.demo);
        assert_eq!(snapshot.pools.len(), 3);
        assert!(snapshot.selected_pool.is_none());
        assert!(!snapshot.tickets.is_empty());
        assert_eq!(snapshot.admin_rows.len(), 3);
    }

    #[test]
    fn apply_pools__first_load__reports_count() {
        let controller = live_with(vec![pool("0xa1", T + 50_000)]);
        assert_eq!(controller.status(), "Loaded 1 pools");
    }

    #[test]
    fn select_prev_pool__from_nothing__picks_last_open() {
        let mut controller = live_with(vec![pool("0xa1", T + 10_000), pool("0xc3", T + 20_000)]);
        controller.select_prev_pool(T);
        assert_eq!(controller.snapshot(T).selected_pool.unwrap().id, "0xc3");
    }

    #[test]
    fn select_next_pool__skips_expired_and_wraps() {
        // given
        let mut controller = live_with(vec![
            pool("0xa1", T + 10_000),
            pool("0xb2", T - 1),
            pool("0xc3", T + 20_000),
        ]);

        // when
        controller.select_next_pool(T);
        let first = controller.snapshot(T).selected_pool.unwrap().id;
        controller.select_next_pool(T);
        let second = controller.snapshot(T).selected_pool.unwrap().id;
        controller.select_next_pool(T);
        let third = controller.snapshot(T).selected_pool.unwrap().id;

        // then
        assert_eq!(first, "0xa1");
        assert_eq!(second, "0xc3");
        assert_eq!(third, "0xa1");
    }

    #[test]
    fn prepare_purchase__without_selection__is_refused() {
        let controller = live_with(Vec::new());
        let err = controller.prepare_purchase("4.2", "1", T).unwrap_err();
        assert!(matches!(err, ChainError::InvalidInput(_)));
    }

    #[test]
    fn prepare_purchase__quantity_out_of_range__is_refused() {
        let mut controller = live_with(vec![pool("0xa1", T + 10_000)]);
        controller.select_next_pool(T);
        assert!(controller.prepare_purchase("4.2", "0", T).is_err());
        assert!(controller.prepare_purchase("4.2", "11", T).is_err());
        assert!(controller.prepare_purchase("4.2", "two", T).is_err());
        assert_eq!(controller.prepare_purchase("4.2", " 3 ", T).unwrap().quantity, 3);
    }

    #[test]
    fn begin_pool_refresh__while_outstanding__keeps_first_token_current() {
        // given
        let mut controller = AppController::new(&config(false), T);
        let token = controller.begin_pool_refresh().unwrap();

        // when
        let overlapping: Vec<_> = (0..5).map(|_| controller.begin_pool_refresh()).collect();
        controller.apply_pools(token, Ok(vec![pool("0xa1", T + 10_000)]), T);

        // then
        assert!(overlapping.iter().all(Option::is_none));
        let snapshot = controller.snapshot(T);
        assert_eq!(snapshot.pools.len(), 1);
        assert!(!snapshot.pools_loading);
        assert_eq!(controller.status(), "Loaded 1 pools");
        assert!(controller.begin_pool_refresh().is_some());
    }

    #[test]
    fn begin_pool_refresh__after_failure__can_start_again() {
        let mut controller = AppController::new(&config(false), T);
        let token = controller.begin_pool_refresh().unwrap();
        controller.apply_pools(token, Err(ChainError::Timeout(Duration::from_secs(15))), T);
        assert!(controller.begin_pool_refresh().is_some());
    }

    #[test]
    fn begin_admin_listing__while_outstanding__is_skipped() {
        let mut controller = AppController::new(&config(false), T);
        let token = controller.begin_admin_listing().unwrap();
        assert!(controller.begin_admin_listing().is_none());
        controller.apply_admin_listing(token, Ok(vec![pool("0xa1", T + 10_000)]));
        assert_eq!(controller.snapshot(T).admin_rows.len(), 1);
        assert!(controller.begin_admin_listing().is_some());
    }

    #[test]
    fn begin_ticket_fetch__needs_account_and_no_fetch_outstanding() {
        // given
        let mut controller = AppController::new(&config(false), T);
        assert!(controller.begin_ticket_fetch().is_none());
        controller.set_account(Ok("0x5a".parse().unwrap()));

        // when
        let first = controller.begin_ticket_fetch();
        let overlapping = controller.begin_ticket_fetch();
        controller.apply_tickets(Ok(Vec::new()), T);

        // then
        assert!(first.is_some());
        assert!(overlapping.is_none());
        assert!(controller.begin_ticket_fetch().is_some());
    }

    #[test]
    fn apply_purchase__success__adds_provisional_ticket() {
        // given
        let mut controller = live_with(vec![pool("0xa1", T + 10_000)]);
        controller.select_next_pool(T);
        let request = controller.prepare_purchase("$4.7", "2", T).unwrap();
        let batch = PurchaseBatch {
            receipts: vec![receipt(Some("0x7001")), receipt(None)],
            failure: None,
        };

        // when
        controller.apply_purchase(&request, batch, T);

        // then
        let snapshot = controller.snapshot(T);
        assert_eq!(snapshot.tickets.len(), 2);
        assert!(snapshot.tickets.iter().all(|t| t.provisional));
        assert_eq!(snapshot.tickets[0].status, TicketStatus::Active);
        assert_eq!(snapshot.tickets[0].pool_id.as_deref(), Some("0xa1"));
        assert_eq!(snapshot.tickets[1].id, "0x7001".parse::<SuiAddress>().unwrap().to_string());
        assert_eq!(snapshot.pot_delta, Some(2 * MIST_PER_SUI));
        assert_eq!(snapshot.selected_pool.unwrap().pot_mist, 3 * MIST_PER_SUI);
        assert!(snapshot.errors.is_empty());
    }

    #[test]
    fn apply_purchase__partial_batch__keeps_bought_and_reports_rest() {
        // given
        let mut controller = live_with(vec![pool("0xa1", T + 10_000)]);
        controller.select_next_pool(T);
        let request = controller.prepare_purchase("4", "3", T).unwrap();
        let batch = PurchaseBatch {
            receipts: vec![receipt(None)],
            failure: Some(ChainError::Signing("rejected".to_string())),
        };

        // when
        controller.apply_purchase(&request, batch, T);

        // then
        let snapshot = controller.snapshot(T);
        assert_eq!(snapshot.tickets.len(), 1);
        assert_eq!(snapshot.pot_delta, Some(MIST_PER_SUI));
        assert_eq!(snapshot.errors.len(), 1);
        assert!(snapshot.errors[0].contains("after 1 of 3"));
    }

    #[test]
    fn record_demo_purchase__adds_quantity_tickets_and_pot() {
        // given
        let mut controller = AppController::new(&config(true), T);
        controller.select_next_pool(T);
        let before = controller.snapshot(T);
        let request = controller.prepare_purchase("4.7", "3", T).unwrap();

        // when
        controller.record_demo_purchase(&request, T);

        // then
        let after = controller.snapshot(T);
        assert_eq!(after.tickets.len(), before.tickets.len() + 3);
        assert_eq!(
            after.selected_pool.unwrap().pot_mist,
            before.selected_pool.unwrap().pot_mist + 3 * request.pool.ticket_price_mist
        );
    }

    #[test]
    fn apply_purchase__failure__records_error_only() {
        // given
        let mut controller = live_with(vec![pool("0xa1", T + 10_000)]);
        controller.select_next_pool(T);
        let request = controller.prepare_purchase("4", "1", T).unwrap();
        let batch = PurchaseBatch {
            receipts: Vec::new(),
            failure: Some(ChainError::Signing("rejected".to_string())),
        };

        // when
        controller.apply_purchase(&request, batch, T);

        // then
        let snapshot = controller.snapshot(T);
        assert!(snapshot.tickets.is_empty());
        assert_eq!(snapshot.errors.len(), 1);
        assert!(snapshot.errors[0].contains("rejected"));
    }

    #[test]
    fn request_stop__twice__second_is_in_flight() {
        // given
        let mut controller = live_with(vec![pool("0xa1", T + 10_000)]);

        // when
        controller.request_stop("0xa1").unwrap();
        let second = controller.request_stop("0xa1");

        // then
        assert!(matches!(second, Err(ChainError::ActionInFlight(_))));
        assert_eq!(controller.snapshot(T).admin_rows[0].status, RowStatus::StopPending);
    }

    #[test]
    fn apply_stop__failure__reverts_row() {
        // given
        let mut controller = live_with(vec![pool("0xa1", T + 10_000)]);
        controller.request_stop("0xa1").unwrap();

        // when
        controller.apply_stop("0xa1", Err(ChainError::Execution("abort".to_string())));

        // then
        let snapshot = controller.snapshot(T);
        assert_eq!(snapshot.admin_rows[0].status, RowStatus::Active);
        assert_eq!(snapshot.errors.len(), 1);
    }

    #[test]
    fn apply_stop__success__marks_stopped() {
        let mut controller = live_with(vec![pool("0xa1", T + 10_000)]);
        controller.request_stop("0xa1").unwrap();
        controller.apply_stop("0xa1", Ok(executed()));
        assert_eq!(controller.snapshot(T).admin_rows[0].status, RowStatus::Stopped);
    }

    #[test]
    fn admin_actions__in_demo__are_refused() {
        let mut controller = AppController::new(&config(true), T);
        let id = controller.snapshot(T).admin_rows[0].pool.id.clone();
        assert!(controller.prepare_start("1").is_err());
        assert!(controller.request_stop(&id).is_err());
        assert!(controller.prepare_oracle_setting("SUI/USD").is_err());
    }

    #[test]
    fn prepare_oracle_setting__hex_or_text() {
        let controller = live_with(Vec::new());
        assert_eq!(controller.prepare_oracle_setting("0x0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(controller.prepare_oracle_setting(" SUI ").unwrap(), b"SUI".to_vec());
        assert!(controller.prepare_oracle_setting("0xzz").is_err());
        assert!(controller.prepare_oracle_setting("  ").is_err());
    }

    #[test]
    fn push_error__keeps_latest_fifty() {
        // given
        let mut controller = live_with(Vec::new());

        // when
        for i in 0..60 {
            controller.push_error(format!("e{i}"));
        }

        // then
        assert_eq!(controller.errors().len(), MAX_ERRORS);
        assert_eq!(controller.errors()[0], "e10");
    }

    #[test]
    fn apply_tickets__failure__keeps_book() {
        let mut controller = AppController::new(&config(true), T);
        let before = controller.snapshot(T).tickets.len();
        controller.apply_tickets(Err(ChainError::transport(Some(500), "down")), T);
        assert_eq!(controller.snapshot(T).tickets.len(), before);
        assert_eq!(controller.errors().len(), 1);
    }

    #[test]
    fn tick__selected_expiry__updates_status() {
        let mut controller = live_with(vec![pool("0xa1", T + 10)]);
        controller.select_next_pool(T);
        controller.tick(T + 10);
        assert_eq!(controller.status(), "Selected round expired");
        assert!(controller.snapshot(T + 10).selected_pool.is_none());
    }
}

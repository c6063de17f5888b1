use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use camstep_embedded::{
    Clock, DeviceConfig, Dispatcher, Effect, FirmwareSink, TEXT_HTML, TEXT_PLAIN, UpdateError,
    UpdateGuard, UpdateKind, UpdateSession, query_param,
};
use embedded_svc::http::server::{Connection, Request};
use embedded_svc::http::{Headers, Method};
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::io::{Read, Write};
use esp_idf_svc::ota::EspOta;
use log::{info, warn};

use crate::ota::OtaSink;
use crate::storage;
use crate::{EspClock, SharedBank};

const STACK_SIZE: usize = 10240;
const OTA_CHUNK_SIZE: usize = 4096;
const UPDATE_RESTART_DELAY: Duration = Duration::from_millis(500);

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

fn respond<C>(req: Request<C>, status: u16, content_type: &str, body: &[u8]) -> anyhow::Result<()>
where
    C: Connection,
    C::Error: std::error::Error + Send + Sync + 'static,
{
    let headers = [
        ("Content-Type", content_type),
        CORS_HEADERS[0],
        CORS_HEADERS[1],
        CORS_HEADERS[2],
    ];
    req.into_response(status, None, &headers)?.write_all(body)?;
    Ok(())
}

fn not_found<C>(req: Request<C>) -> anyhow::Result<()>
where
    C: Connection,
    C::Error: std::error::Error + Send + Sync + 'static,
{
    respond(req, 404, TEXT_PLAIN, b"Not Found")
}

fn split_uri(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    }
}

pub fn schedule_restart(delay: Duration) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("restart".into())
        .spawn(move || {
            thread::sleep(delay);
            info!("restarting");
            unsafe { esp_idf_svc::sys::esp_restart() };
        })?;
    Ok(())
}

/// Locks the bank for each hook only, so the control loop keeps running between chunks.
struct BankGuard<'a> {
    bank: &'a SharedBank,
}

impl UpdateGuard for BankGuard<'_> {
    fn on_update_start(&mut self, kind: UpdateKind) {
        match self.bank.lock() {
            Ok(mut bank) => bank.on_update_start(kind),
            Err(_) => warn!("motor bank poisoned, cannot halt motors"),
        }
    }

    fn on_update_error(&mut self, error: UpdateError) {
        match self.bank.lock() {
            Ok(mut bank) => bank.on_update_error(error),
            Err(_) => warn!("motor bank poisoned, cannot re-enable drivers"),
        }
    }

    fn on_update_end(&mut self) {
        match self.bank.lock() {
            Ok(mut bank) => bank.on_update_end(),
            Err(_) => warn!("motor bank poisoned"),
        }
    }
}

fn receive_image<C: Connection, S: FirmwareSink>(
    req: &mut Request<C>,
    mut session: UpdateSession<S>,
    guard: &mut BankGuard<'_>,
) -> Result<(), UpdateError> {
    let mut chunk = [0u8; OTA_CHUNK_SIZE];

    loop {
        let read = match req.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) => {
                warn!("upload interrupted: {:?}", e);
                return session.abort(UpdateError::Connect, guard);
            }
        };
        session.write(&chunk[..read], guard)?;
    }

    session.finish(guard)
}

pub fn setup_http_server(
    bank: SharedBank,
    config: &DeviceConfig,
    ota_password: &'static str,
) -> anyhow::Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&Configuration {
        stack_size: STACK_SIZE,
        uri_match_wildcard: true,
        ..Default::default()
    })?;

    server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| match storage::read("index.html") {
        Some(page) => respond(req, 200, TEXT_HTML, &page),
        None => not_found(req),
    })?;

    {
        let bank = bank.clone();
        server.fn_handler::<anyhow::Error, _>("/update", Method::Post, move |mut req| {
            let (_, query) = split_uri(req.uri());
            let kind = UpdateKind::from_query(query_param(query, "kind").as_deref());
            let password = req.header("X-Update-Password").map(str::to_owned);
            let total = req.content_len().map(|len| len as usize);

            let mut ota = EspOta::new()?;
            let mut guard = BankGuard { bank: &bank };

            let result = UpdateSession::begin(
                OtaSink::new(&mut ota),
                kind,
                total,
                ota_password,
                password.as_deref(),
                &mut guard,
            )
            .and_then(|session| receive_image(&mut req, session, &mut guard));

            match result {
                Ok(()) => {
                    respond(req, 200, TEXT_PLAIN, b"OK")?;
                    schedule_restart(UPDATE_RESTART_DELAY)
                }
                Err(UpdateError::Auth) => respond(req, 401, TEXT_PLAIN, b"Update failed: Auth Failed"),
                Err(e) => respond(req, 500, TEXT_PLAIN, format!("Update failed: {}", e).as_bytes()),
            }
        })?;
    }

    let dispatcher = Dispatcher::new(config);
    let clock = EspClock;

    server.fn_handler::<anyhow::Error, _>("/*", Method::Get, move |req| {
        let uri = req.uri().to_owned();
        let (path, query) = split_uri(&uri);

        let reply = {
            let mut bank = bank.lock().map_err(|_| anyhow!("motor bank poisoned"))?;
            dispatcher.dispatch(&mut bank, path, query, clock.now_ms())
        };

        match reply {
            Some(reply) => {
                respond(req, 200, reply.content_type, reply.body.as_bytes())?;
                if let Some(Effect::Reboot { delay_ms }) = reply.effect {
                    schedule_restart(Duration::from_millis(delay_ms))?;
                }
                Ok(())
            }
            None => not_found(req),
        }
    })?;

    Ok(server)
}

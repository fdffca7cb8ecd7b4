//! Client sessions
//!
//! One session per connected client: a reader thread drains the client's
//! requests from the socket, a writer thread pushes server events back,
//! and every window gets its own worker thread draining that window's
//! tasks (redraw wake-ups and the update handshake) under the clipping
//! lock in shared mode.

use std::collections::HashMap;
use std::os::unix::net::UnixStream;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use tracing::{debug, info, warn};

use strata_ipc::{ClientRequest, FramedMessage, ServerEvent};

use crate::desktop::Desktop;
use crate::region::{Rect, Region};
use crate::window::flags::{WindowFeel, WindowFlags};
use crate::window::{ClientLink, ViewInfo, WindowId, WindowTask};

/// One connected client and the windows it owns
pub struct Session {
    desktop: Arc<Desktop>,
    event_tx: Sender<ServerEvent>,
    workers: HashMap<WindowId, WindowWorker>,
}

struct WindowWorker {
    task_tx: Sender<WindowTask>,
    handle: JoinHandle<()>,
}

impl Session {
    /// Serve one client connection until it disconnects
    pub fn run(desktop: Arc<Desktop>, stream: UnixStream) -> Result<()> {
        let (event_tx, event_rx) = mpsc::channel();
        let writer_stream = stream.try_clone()?;
        let writer = thread::spawn(move || Self::write_events(writer_stream, event_rx));

        let mut session = Session {
            desktop,
            event_tx,
            workers: HashMap::new(),
        };
        session.read_requests(stream);
        session.shutdown();
        drop(session);
        let _ = writer.join();
        Ok(())
    }

    fn write_events(mut stream: UnixStream, event_rx: Receiver<ServerEvent>) {
        while let Ok(event) = event_rx.recv() {
            let Ok(msg) = FramedMessage::new(&event) else {
                warn!("failed to encode event, dropping");
                continue;
            };
            if msg.write_to(&mut stream).is_err() {
                debug!("client stream closed, writer exiting");
                break;
            }
        }
    }

    fn read_requests(&mut self, mut stream: UnixStream) {
        loop {
            let msg = match FramedMessage::read_from(&mut stream) {
                Ok(msg) => msg,
                Err(_) => {
                    info!("client disconnected");
                    return;
                }
            };
            match FramedMessage::decode_client_request(&msg.data) {
                Ok(request) => self.dispatch(request),
                Err(e) => warn!("malformed client request: {}", e),
            }
        }
    }

    fn dispatch(&mut self, request: ClientRequest) {
        match request {
            ClientRequest::CreateWindow {
                x,
                y,
                width,
                height,
                title,
                look,
            } => {
                self.create_window(Rect::from_xywh(x, y, width, height), &title, look);
            }

            ClientRequest::DestroyWindow { window } => self.destroy_window(window),

            ClientRequest::ShowWindow { window, shown } => {
                let result = if shown {
                    self.desktop.show_window(window)
                } else {
                    self.desktop.hide_window(window)
                };
                if let Err(e) = result {
                    warn!("show_window: {}", e);
                }
            }

            ClientRequest::MoveWindowBy { window, dx, dy } => {
                if let Err(e) = self.desktop.move_window_by(window, dx, dy, true) {
                    warn!("move_window_by: {}", e);
                }
            }

            ClientRequest::ResizeWindowBy { window, dx, dy } => {
                if let Err(e) = self.desktop.resize_window_by(window, dx, dy, true) {
                    warn!("resize_window_by: {}", e);
                }
            }

            // The handshake runs on the window's own thread
            ClientRequest::BeginUpdate { window } => {
                self.post_task(window, WindowTask::BeginUpdate)
            }
            ClientRequest::EndUpdate { window } => self.post_task(window, WindowTask::EndUpdate),

            ClientRequest::InvalidateRegion { window, rects } => {
                let mut region = Region::new();
                for [x, y, w, h] in rects {
                    region.include_rect(&Rect::from_xywh(x, y, w, h));
                }
                if let Err(e) = self.desktop.invalidate_window(window, &region) {
                    warn!("invalidate: {}", e);
                }
            }

            ClientRequest::SetTitle { window, title } => {
                if let Err(e) = self.desktop.set_window_title(window, &title) {
                    warn!("set_title: {}", e);
                }
            }

            ClientRequest::AddView {
                window,
                view,
                x,
                y,
                width,
                height,
            } => {
                let info = ViewInfo {
                    id: view,
                    frame: Rect::from_xywh(x, y, width, height),
                };
                if let Err(e) = self
                    .desktop
                    .with_window_shared(window, |w| w.add_view(info))
                {
                    warn!("add_view: {}", e);
                }
            }

            ClientRequest::RemoveView { window, view } => {
                if let Err(e) = self
                    .desktop
                    .with_window_shared(window, |w| w.remove_view(view))
                {
                    warn!("remove_view: {}", e);
                }
            }
        }
    }

    fn create_window(&mut self, frame: Rect, title: &str, look: Option<strata_ipc::WindowLook>) {
        let look = look.unwrap_or_else(|| self.desktop.decor_manager().default_look());
        let (task_tx, task_rx) = mpsc::channel();
        let link = ClientLink::new(self.event_tx.clone());
        let window = match self.desktop.create_window(
            frame,
            title,
            look,
            WindowFeel::Normal,
            WindowFlags::default(),
            None,
            link.clone(),
            task_tx.clone(),
        ) {
            Ok(window) => window,
            Err(e) => {
                // Construction failure is fatal to this window only
                warn!("window refused: {}", e);
                return;
            }
        };

        let id = window.id();
        let handle = spawn_window_thread(self.desktop.clone(), id, link, task_rx);
        self.workers.insert(id, WindowWorker { task_tx, handle });

        let _ = self.event_tx.send(ServerEvent::WindowCreated { window: id });
        info!(window = id, title, "window created for session");
    }

    fn destroy_window(&mut self, id: WindowId) {
        if let Err(e) = self.desktop.remove_window(id) {
            warn!("destroy_window: {}", e);
            return;
        }
        if let Some(worker) = self.workers.remove(&id) {
            let _ = worker.task_tx.send(WindowTask::Quit);
            let _ = worker.handle.join();
        }
        let _ = self
            .event_tx
            .send(ServerEvent::WindowDestroyed { window: id });
    }

    fn post_task(&self, id: WindowId, task: WindowTask) {
        match self.workers.get(&id) {
            Some(worker) => {
                let _ = worker.task_tx.send(task);
            }
            None => warn!(window = id, "task for unknown window"),
        }
    }

    /// The client went away: its windows and their pending sessions go
    /// with it
    fn shutdown(&mut self) {
        let ids: Vec<WindowId> = self.workers.keys().copied().collect();
        for id in ids {
            self.destroy_window(id);
        }
    }
}

/// Spawn the per-window thread draining that window's tasks.
///
/// Every task runs with the clipping lock held in shared mode for its
/// whole span; the thread only ever touches its own window's state.
fn spawn_window_thread(
    desktop: Arc<Desktop>,
    id: WindowId,
    link: ClientLink,
    task_rx: Receiver<WindowTask>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(task) = task_rx.recv() {
            match task {
                WindowTask::Redraw => {
                    let _ = desktop.with_window_shared(id, |window| {
                        window.redraw_dirty_region();
                    });
                }

                WindowTask::BeginUpdate => {
                    let _ = desktop.with_window_shared(id, |window| {
                        match window.begin_update() {
                            Ok(info) => link.send(ServerEvent::UpdateGranted {
                                window: id,
                                origin_x: info.origin_x,
                                origin_y: info.origin_y,
                                width: info.width,
                                height: info.height,
                                expose: info.expose,
                                views: info.views,
                            }),
                            Err(e) => {
                                // Protocol misuse: answer with a
                                // failure, window stays usable
                                warn!("begin_update: {}", e);
                                link.send(ServerEvent::UpdateDenied { window: id });
                            }
                        }
                    });
                }

                WindowTask::EndUpdate => {
                    let _ = desktop.with_window_shared(id, |window| {
                        if let Err(e) = window.end_update() {
                            warn!("end_update: {}", e);
                        }
                    });
                }

                WindowTask::Quit => break,
            }
        }
        debug!(window = id, "window thread exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;

    /// Full round through the worker thread: dirty → wake → redraw →
    /// begin/end update, with the grant delivered over the event channel.
    #[test]
    fn test_window_thread_runs_update_round() {
        let desktop = Arc::new(Desktop::new(&Config::default()));
        let (event_tx, event_rx) = mpsc::channel();
        let (task_tx, task_rx) = mpsc::channel();
        let link = ClientLink::new(event_tx);

        let window = desktop
            .create_window(
                Rect::from_xywh(0, 0, 100, 100),
                "round",
                strata_ipc::WindowLook::NoBorder,
                WindowFeel::Normal,
                WindowFlags::default(),
                None,
                link.clone(),
                task_tx.clone(),
            )
            .unwrap();
        let id = window.id();
        let handle = spawn_window_thread(desktop.clone(), id, link, task_rx);

        desktop.show_window(id).unwrap();
        // Showing exposed the whole window; the wake-up is already in
        // the task channel and the thread turns it into a redraw pass
        // followed by an update-pending notification.
        let pending = event_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("update pending");
        assert!(matches!(pending, ServerEvent::UpdatePending { window } if window == id));

        task_tx.send(WindowTask::BeginUpdate).unwrap();
        let granted = event_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("update granted");
        match granted {
            ServerEvent::UpdateGranted { width, height, .. } => {
                assert_eq!((width, height), (100, 100));
            }
            other => panic!("expected grant, got {:?}", other),
        }

        task_tx.send(WindowTask::EndUpdate).unwrap();
        task_tx.send(WindowTask::Quit).unwrap();
        handle.join().unwrap();

        assert!(!window.is_in_update());
        assert!(!window.is_update_requested());
    }

    #[test]
    fn test_omitted_look_falls_back_to_config_default() {
        let desktop = Arc::new(Desktop::new(&Config::default()));
        let (event_tx, event_rx) = mpsc::channel();
        let mut session = Session {
            desktop: desktop.clone(),
            event_tx,
            workers: HashMap::new(),
        };

        session.dispatch(ClientRequest::CreateWindow {
            x: 0,
            y: 0,
            width: 100,
            height: 100,
            title: "fallback".into(),
            look: None,
        });

        let created = event_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("creation event");
        let window = match created {
            ServerEvent::WindowCreated { window } => window,
            other => panic!("expected creation, got {:?}", other),
        };
        let look = desktop.with_window_shared(window, |w| w.look()).unwrap();
        assert_eq!(look, crate::config::DecoratorConfig::default().default_look);

        session.shutdown();
    }

    #[test]
    fn test_begin_update_without_request_is_denied() {
        let desktop = Arc::new(Desktop::new(&Config::default()));
        let (event_tx, event_rx) = mpsc::channel();
        let (task_tx, task_rx) = mpsc::channel();
        let link = ClientLink::new(event_tx);

        let window = desktop
            .create_window(
                Rect::from_xywh(0, 0, 50, 50),
                "deny",
                strata_ipc::WindowLook::NoBorder,
                WindowFeel::Normal,
                WindowFlags::default(),
                None,
                link.clone(),
                task_tx.clone(),
            )
            .unwrap();
        let handle = spawn_window_thread(desktop.clone(), window.id(), link, task_rx);

        task_tx.send(WindowTask::BeginUpdate).unwrap();
        let denied = event_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("denial");
        assert!(matches!(denied, ServerEvent::UpdateDenied { .. }));

        task_tx.send(WindowTask::Quit).unwrap();
        handle.join().unwrap();
    }
}

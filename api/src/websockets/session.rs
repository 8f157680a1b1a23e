use actix::prelude::*;
use actix_web_actors::ws;
use futures::StreamExt;
use keyvalue_common::{Display, MaintenanceComplaint};
use keyvalue_portal::MaintenanceDesk;
use log::{debug, warn};
use serde_json::json;

/// One snapshot of the watched room, tagged with the watch it came from so
/// late items from a replaced feed can be ignored.
struct RoomSnapshot {
    generation: u64,
    complaint: Option<MaintenanceComplaint>,
}

/// Streams the complaint of one room to the client. A text frame carrying
/// another room number moves the watch there; the old subscription is
/// dropped with its stream.
pub struct ComplaintWsActor {
    desk: MaintenanceDesk,
    room: String,
    generation: u64,
    feed: Option<SpawnHandle>,
}

impl ComplaintWsActor {
    pub fn new(desk: MaintenanceDesk, room: String) -> Self {
        ComplaintWsActor {
            desk,
            room,
            generation: 0,
            feed: None,
        }
    }

    fn watch(&mut self, room: &str, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some(handle) = self.feed.take() {
            ctx.cancel_future(handle);
        }
        self.generation += 1;
        self.room = room.trim().to_string();
        if self.room.is_empty() {
            ctx.text(json!({ "room": null, "complaint": null }).to_string());
            return;
        }

        let generation = self.generation;
        let desk = self.desk.clone();
        let room = self.room.clone();
        let opening = async move { desk.watch(&room).await }
            .into_actor(self)
            .map(move |res, act, ctx| {
                if generation != act.generation {
                    // another room was picked meanwhile; the feed drops here
                    return;
                }
                match res {
                    Ok(feed) => {
                        let snapshots =
                            feed.map(move |complaint| RoomSnapshot { generation, complaint });
                        act.feed = Some(ctx.add_stream(snapshots));
                    }
                    Err(e) => {
                        warn!("could not watch room {}: {}", act.room, e);
                        ctx.text(json!({ "room": act.room, "error": e.to_string() }).to_string());
                    }
                }
            });
        self.feed = Some(ctx.spawn(opening));
    }
}

impl Actor for ComplaintWsActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let room = self.room.clone();
        self.watch(&room, ctx);
    }

    fn stopping(&mut self, ctx: &mut Self::Context) -> Running {
        if let Some(handle) = self.feed.take() {
            ctx.cancel_future(handle);
        }
        debug!("complaint socket for room {} closing", self.room);
        Running::Stop
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ComplaintWsActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Pong(_)) => (),
            Ok(ws::Message::Text(room)) => self.watch(&room, ctx),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => (),
        }
    }
}

impl StreamHandler<RoomSnapshot> for ComplaintWsActor {
    fn handle(&mut self, msg: RoomSnapshot, ctx: &mut Self::Context) {
        if msg.generation != self.generation {
            return;
        }
        let complaint = msg.complaint.as_ref().map(|complaint| complaint.display());
        ctx.text(json!({ "room": self.room, "complaint": complaint }).to_string());
    }

    // the store closing one feed must not end the socket
    fn finished(&mut self, _ctx: &mut Self::Context) {
        debug!("complaint feed for room {} ended", self.room);
    }
}

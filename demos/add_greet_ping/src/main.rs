//! Minimal runnable walkthrough of three demo methods: ADD (method 0),
//! GREET (method 2), PING (method 3, void response). Method id 1 is
//! intentionally unused.
//!
//! Two peers are wired directly over `tokio::sync::mpsc` channels, standing
//! in for whatever real transport an integrator would plug in. The request
//! and response bodies are hand-rolled little-endian/UTF-8 encodings:
//! `corepeer` treats bodies as opaque bytes produced by an external
//! serialization toolkit, which this demo does not depend on.

use std::sync::Arc;

use anyhow::Result;
use corepeer::{DecodeError, Peer, PeerConfig, WireDecode, WireEncode};
use tokio::sync::mpsc;

const METHOD_ADD: u16 = 0;
const METHOD_GREET: u16 = 2;
const METHOD_PING: u16 = 3;

struct AddRequest {
    a: i32,
    b: i32,
}

impl WireEncode for AddRequest {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.a.to_le_bytes());
        buf.extend_from_slice(&self.b.to_le_bytes());
    }
}

impl WireDecode for AddRequest {
    fn decode_from(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 8 {
            return Err("AddRequest needs 8 bytes".into());
        }
        Ok(Self {
            a: i32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            b: i32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        })
    }
}

struct AddResponse {
    result: i32,
}

impl WireEncode for AddResponse {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.result.to_le_bytes());
    }
}

impl WireDecode for AddResponse {
    fn decode_from(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 4 {
            return Err("AddResponse needs 4 bytes".into());
        }
        Ok(Self {
            result: i32::from_le_bytes(bytes[0..4].try_into().unwrap()),
        })
    }
}

struct GreetRequest {
    name: String,
}

impl WireEncode for GreetRequest {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.name.as_bytes());
    }
}

impl WireDecode for GreetRequest {
    fn decode_from(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            name: std::str::from_utf8(bytes)
                .map_err(|_| DecodeError::from("GreetRequest name is not UTF-8"))?
                .to_string(),
        })
    }
}

struct GreetResponse {
    message: String,
}

impl WireEncode for GreetResponse {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.message.as_bytes());
    }
}

impl WireDecode for GreetResponse {
    fn decode_from(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            message: std::str::from_utf8(bytes)
                .map_err(|_| DecodeError::from("GreetResponse message is not UTF-8"))?
                .to_string(),
        })
    }
}

struct PingRequest {
    timestamp: u64,
}

impl WireEncode for PingRequest {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
    }
}

impl WireDecode for PingRequest {
    fn decode_from(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 8 {
            return Err("PingRequest needs 8 bytes".into());
        }
        Ok(Self {
            timestamp: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let client = Arc::new(Peer::<()>::new(PeerConfig::default()));
    let server = Arc::new(Peer::<()>::new(PeerConfig::default()));

    let (tx_cs, mut rx_cs) = mpsc::unbounded_channel::<Vec<u8>>();
    let (tx_sc, mut rx_sc) = mpsc::unbounded_channel::<Vec<u8>>();

    client.set_transport_sink(move |bytes, _| {
        let _ = tx_cs.send(bytes.to_vec());
    });
    server.set_transport_sink(move |bytes, _| {
        let _ = tx_sc.send(bytes.to_vec());
    });

    let server_for_pump = Arc::clone(&server);
    tokio::spawn(async move {
        while let Some(bytes) = rx_cs.recv().await {
            server_for_pump.from_transport(&bytes, ());
        }
    });
    let client_for_pump = Arc::clone(&client);
    tokio::spawn(async move {
        while let Some(bytes) = rx_sc.recv().await {
            client_for_pump.from_transport(&bytes, ());
        }
    });

    server.register_handler::<AddRequest, AddResponse, _, _>(METHOD_ADD, |req, _| async move {
        Ok(AddResponse {
            result: req.a + req.b,
        })
    });
    server.register_handler::<GreetRequest, GreetResponse, _, _>(METHOD_GREET, |req, _| async move {
        Ok(GreetResponse {
            message: format!("Hello, {}!", req.name),
        })
    });
    server.register_handler::<PingRequest, (), _, _>(METHOD_PING, |_req, _| async move { Ok(()) });

    let sum = client
        .request::<AddRequest, AddResponse>(METHOD_ADD, &AddRequest { a: 10, b: 32 }, ())
        .await?
        .expect("ADD declares a response");
    println!("ADD(10, 32) = {}", sum.result);

    let greeting = client
        .request::<GreetRequest, GreetResponse>(
            METHOD_GREET,
            &GreetRequest {
                name: "World".to_string(),
            },
            (),
        )
        .await?
        .expect("GREET declares a response");
    println!("GREET(\"World\") = {}", greeting.message);

    let void = client
        .request::<PingRequest, ()>(METHOD_PING, &PingRequest { timestamp: 1 }, ())
        .await?;
    println!("PING(1) resolved to void: {}", void.is_none());

    client.clean("demo complete");
    Ok(())
}

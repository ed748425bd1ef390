//! End-to-end TCP echo loopback: bind, accept one connection,
//! echo back whatever the client sends, driven entirely by the ring.

use ringrt::context::{ContextConfig, RunningContext};
use ringrt::net::{TcpListener, TcpStream};
use ringrt::task;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn echoes_one_message_over_loopback() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let listener = TcpListener::bind(bind_addr).expect("bind loopback listener");
    let server_addr = listener.local_addr().expect("resolve bound port");

    let (server_done_tx, server_done_rx) = mpsc::channel::<()>();
    task::spawn_on(&ctx.handle(), async move {
        let conn = listener.accept().await.expect("accept loopback client");
        let mut buf = [0u8; 64];
        let n = conn.recv(&mut buf).await.expect("recv from client");
        conn.send(&buf[..n]).await.expect("echo back to client");
        server_done_tx.send(()).expect("test still waiting");
    });

    let (client_done_tx, client_done_rx) = mpsc::channel::<Vec<u8>>();
    task::spawn_on(&ctx.handle(), async move {
        let conn = TcpStream::connect(server_addr)
            .await
            .expect("connect to loopback server");
        conn.send(b"ping").await.expect("send to server");
        let mut buf = [0u8; 64];
        let n = conn.recv(&mut buf).await.expect("recv echo");
        client_done_tx
            .send(buf[..n].to_vec())
            .expect("test still waiting");
    });

    server_done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("server side should finish");
    let echoed = client_done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("client side should finish");
    assert_eq!(echoed, b"ping");

    ctx.stop();
    ctx.join();
}

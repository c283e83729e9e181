//! End-to-end tests speaking the wire protocol against a live server.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use tessera::config::Config;
use tessera::server::TesseraServer;
use tessera_core::chunk::codec;
use tessera_core::chunk_saver::RegionManager;
use tessera_core::{Chunk, World};
use tessera_utils::ChunkPos;
use tessera_world::TerrainPipeline;

fn test_config() -> Config {
    let mut config = Config::default();
    config.port = 0;
    config.spawn_warmup_radius = 0;
    config
}

async fn start_server(config: Config, dir: &Path) -> (SocketAddr, CancellationToken) {
    let config = Arc::new(config);
    let world = World::open(
        &dir.join("regions"),
        config.world_seed,
        config.emergency_threshold,
        config.server_max_chunks,
    )
    .expect("open world");
    let mut server = TesseraServer::bind(config, world).await.expect("bind");
    let addr = server.local_addr().expect("addr");
    let cancel = server.cancel_token();
    tokio::spawn(async move {
        server.run().await;
        server.shutdown().await;
    });
    (addr, cancel)
}

async fn write_command(stream: &mut TcpStream, command: &str) {
    stream
        .write_u16(command.len() as u16)
        .await
        .expect("write len");
    stream
        .write_all(command.as_bytes())
        .await
        .expect("write command");
}

async fn request_chunk(stream: &mut TcpStream, cx: i32, cy: i32) {
    write_command(stream, "GET_CHUNK").await;
    stream.write_i32(cx).await.expect("write cx");
    stream.write_i32(cy).await.expect("write cy");
}

async fn read_string(stream: &mut TcpStream) -> String {
    let len = stream.read_u16().await.expect("read len");
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await.expect("read string");
    String::from_utf8(buf).expect("utf8")
}

async fn login(stream: &mut TcpStream) -> i64 {
    write_command(stream, "LOGIN").await;
    assert_eq!(read_string(stream).await, "LOGIN_OK");
    stream.read_i64().await.expect("read seed")
}

/// Reads one `CHUNK_PROCEDURAL` reply and returns its coordinates.
async fn read_procedural(stream: &mut TcpStream) -> (i32, i32) {
    assert_eq!(read_string(stream).await, "CHUNK_PROCEDURAL");
    let cx = stream.read_i32().await.expect("read cx");
    let cy = stream.read_i32().await.expect("read cy");
    (cx, cy)
}

#[tokio::test]
async fn handshake_is_byte_exact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (addr, _cancel) = start_server(test_config(), dir.path()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    write_command(&mut stream, "LOGIN").await;

    // LOGIN_OK as a prefixed string, then the seed 12345 big-endian.
    let mut reply = [0u8; 18];
    stream.read_exact(&mut reply).await.expect("read reply");
    let mut expected = vec![0u8, 8];
    expected.extend(b"LOGIN_OK");
    expected.extend([0, 0, 0, 0, 0, 0, 0x30, 0x39]);
    assert_eq!(&reply[..], expected.as_slice());
}

#[tokio::test]
async fn fresh_chunks_are_served_procedurally_and_match_local_generation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config();
    let seed = config.world_seed;
    let (addr, _cancel) = start_server(config, dir.path()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    assert_eq!(login(&mut stream).await, seed);

    request_chunk(&mut stream, 0, 0).await;
    assert_eq!(read_procedural(&mut stream).await, (0, 0));

    // The same request is answered the same way.
    request_chunk(&mut stream, 0, 0).await;
    assert_eq!(read_procedural(&mut stream).await, (0, 0));

    // What the server persisted equals a client-side regeneration
    // from the same seed.
    let storage = RegionManager::new(dir.path().join("regions")).expect("storage");
    let bytes = storage
        .read_chunk(ChunkPos::new(0, 0))
        .expect("read")
        .expect("persisted");
    let persisted = codec::decode(&bytes).expect("decode");
    let local = Chunk::generate(&TerrainPipeline::new(seed), ChunkPos::new(0, 0));
    for lx in 0..16 {
        for ly in 0..16 {
            assert_eq!(persisted.tile(lx, ly), local.tile(lx, ly), "cell ({lx}, {ly})");
        }
    }
}

#[tokio::test]
async fn modified_chunks_ship_as_full_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config();
    let seed = config.world_seed;
    let pos = ChunkPos::new(2, 2);

    // Seed the world directory with an edited chunk before boot.
    let edited = {
        let storage = RegionManager::new(dir.path().join("regions")).expect("storage");
        let mut chunk = Chunk::generate(&TerrainPipeline::new(seed), pos);
        chunk.set_modified(true);
        let bytes = codec::encode(&chunk).expect("encode");
        storage.write_chunk(pos, &bytes).expect("write");
        storage.close_all().expect("close");
        chunk
    };

    let (addr, _cancel) = start_server(config, dir.path()).await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let _ = login(&mut stream).await;

    request_chunk(&mut stream, 2, 2).await;
    assert_eq!(read_string(&mut stream).await, "CHUNK_DATA");
    let len = stream.read_i32().await.expect("read len");
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await.expect("read payload");

    let shipped = codec::decode(&payload).expect("decode");
    assert!(shipped.modified());
    assert_eq!(shipped.pos(), pos);
    for lx in 0..16 {
        for ly in 0..16 {
            assert_eq!(shipped.tile(lx, ly), edited.tile(lx, ly));
        }
    }
}

#[tokio::test]
async fn out_of_bounds_requests_are_dropped_silently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config();
    config.max_coordinate = 100;
    let (addr, _cancel) = start_server(config, dir.path()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let _ = login(&mut stream).await;

    request_chunk(&mut stream, 101, 0).await;
    request_chunk(&mut stream, 0, 0).await;

    // The only reply is for the in-bounds chunk; the connection is
    // still healthy.
    assert_eq!(read_procedural(&mut stream).await, (0, 0));
}

#[tokio::test]
async fn chunk_responses_respect_the_rate_limit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config();
    config.max_requests_per_second = 10;
    let (addr, _cancel) = start_server(config, dir.path()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let _ = login(&mut stream).await;

    for i in 0..100 {
        request_chunk(&mut stream, i, 0).await;
    }

    let mut replies = 0;
    while tokio::time::timeout(Duration::from_millis(1500), read_procedural(&mut stream))
        .await
        .is_ok()
    {
        replies += 1;
    }
    assert!(replies <= 10, "{replies} replies for a budget of 10");
    assert!(replies >= 1);

    // A fresh window serves again on the same connection.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    request_chunk(&mut stream, -3, -3).await;
    let reply = tokio::time::timeout(Duration::from_secs(5), read_procedural(&mut stream))
        .await
        .expect("reply after new window");
    assert_eq!(reply, (-3, -3));
}

#[tokio::test]
async fn requests_before_login_close_the_connection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (addr, _cancel) = start_server(test_config(), dir.path()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    request_chunk(&mut stream, 0, 0).await;

    // The server terminates the connection without a reply.
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("server should close promptly");
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn stats_reflect_loaded_chunks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (addr, _cancel) = start_server(test_config(), dir.path()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let _ = login(&mut stream).await;

    request_chunk(&mut stream, 1, 2).await;
    let _ = read_procedural(&mut stream).await;

    write_command(&mut stream, "GET_STATS").await;
    assert_eq!(read_string(&mut stream).await, "STATS_DATA");
    let used = stream.read_i64().await.expect("used");
    let total = stream.read_i64().await.expect("total");
    let active = stream.read_i32().await.expect("active");
    let loaded = stream.read_i32().await.expect("loaded");

    assert!(used > 0);
    assert!(total >= used);
    assert!(active >= 0);
    assert!(loaded >= 1);
}

#[tokio::test]
async fn disconnect_closes_the_connection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (addr, _cancel) = start_server(test_config(), dir.path()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let _ = login(&mut stream).await;
    write_command(&mut stream, "DISCONNECT").await;

    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("server should close promptly");
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn unknown_commands_terminate_the_connection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (addr, _cancel) = start_server(test_config(), dir.path()).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let _ = login(&mut stream).await;
    write_command(&mut stream, "MAKE_ME_ADMIN").await;

    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("server should close promptly");
    assert!(matches!(read, Ok(0) | Err(_)));
}

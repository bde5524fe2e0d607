use std::io::Cursor;

use super::*;
use crate::{
    foundation::error::{DescriptorError, ProtocolError},
    render::CpuRenderer,
    session::{MemoryAvatarService, MemoryDescriptor, MemoryRoster},
    source::ChangeKind,
};

fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn setup() -> (NetworkAvatarSource, Arc<MemoryAvatarService>, Session) {
    let service = Arc::new(MemoryAvatarService::new());
    let session = Session::new(service.clone(), Arc::new(MemoryRoster::new()));
    let source = NetworkAvatarSource::new(
        AccountId::new("romeo@montague.lit"),
        Arc::new(CpuRenderer::new()),
        NETWORK_CACHE_CAPACITY,
        4,
    );
    source.prepare_session(&session);
    (source, service, session)
}

fn record(source: &NetworkAvatarSource) -> Arc<Mutex<Vec<SourceChange>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    source
        .on_avatar_changed()
        .connect(move |c: &SourceChange| sink.lock().unwrap().push(c.clone()));
    seen
}

#[tokio::test]
async fn miss_before_fetch() {
    let (source, _service, _session) = setup();
    let err = source
        .get_cached(&Address::new("juliet@capulet.lit"), &AvatarFont::none())
        .unwrap_err();
    assert!(err.is_not_cached());
}

#[tokio::test]
async fn first_usable_descriptor_wins() {
    let (source, service, _session) = setup();
    let juliet = Address::new("juliet@capulet.lit");
    service.set_descriptors(
        juliet.clone(),
        vec![
            MemoryDescriptor::failing(DescriptorError::NotImplemented),
            MemoryDescriptor::failing(DescriptorError::Runtime("reset".into())),
            MemoryDescriptor::failing(DescriptorError::Cancelled),
            MemoryDescriptor::bytes(b"garbage".to_vec()),
            MemoryDescriptor::bytes(png_bytes([255, 0, 0, 255])),
            MemoryDescriptor::bytes(png_bytes([0, 255, 0, 255])),
        ],
    );
    let seen = record(&source);

    let entry = source.fetch(&juliet).await.unwrap();
    let picture = entry.picture().unwrap();
    let px = picture.pixel(0, 0).unwrap();
    assert_eq!((px.r, px.g, px.b), (255, 0, 0));

    let cached = source.get_cached(&juliet, &AvatarFont::none()).unwrap();
    assert_eq!(cached, entry);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![SourceChange {
            address: juliet,
            kind: ChangeKind::Fetched
        }]
    );
}

#[tokio::test]
async fn protocol_failure_caches_absent() {
    let (source, service, _session) = setup();
    let tybalt = Address::new("tybalt@capulet.lit");
    service.fail_metadata(tybalt.clone(), ProtocolError::Xmpp("item-not-found".into()));

    let entry = source.fetch(&tybalt).await.unwrap();
    assert!(entry.is_absent());
    assert!(source.has_entry(&tybalt));
    assert!(
        source
            .get_cached(&tybalt, &AvatarFont::none())
            .unwrap()
            .is_absent()
    );
}

#[tokio::test]
async fn no_descriptors_caches_absent_and_overwrites() {
    let (source, service, _session) = setup();
    let nurse = Address::new("nurse@capulet.lit");
    service.set_descriptors(
        nurse.clone(),
        vec![MemoryDescriptor::bytes(png_bytes([1, 2, 3, 255]))],
    );
    assert!(source.fetch(&nurse).await.unwrap().picture().is_some());

    service.set_descriptors(nurse.clone(), vec![]);
    assert!(source.fetch(&nurse).await.unwrap().is_absent());
    assert_eq!(source.cached_len(), 1);
}

#[tokio::test]
async fn fetch_without_session_is_an_error() {
    let (source, _service, session) = setup();
    source.shutdown_session(&session);
    assert!(!source.is_prepared());
    let err = source.fetch(&Address::new("x@y")).await.unwrap_err();
    assert!(matches!(err, AvatarError::NotPrepared));
}

#[tokio::test]
async fn metadata_changes_are_forwarded_until_shutdown() {
    let (source, service, session) = setup();
    let seen = record(&source);
    let juliet = Address::new("juliet@capulet.lit");

    service.publish(juliet.clone(), vec![]);
    source.shutdown_session(&session);
    service.publish(juliet.clone(), vec![]);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![SourceChange::upstream(juliet)]
    );
    assert_eq!(service.on_metadata_changed().handler_count(), 0);
}

#[tokio::test]
async fn prepare_is_idempotent_per_session() {
    let (source, service, session) = setup();
    source.prepare_session(&session);
    assert_eq!(service.on_metadata_changed().handler_count(), 1);
}

#[tokio::test]
async fn shutdown_without_prepare_is_harmless() {
    let source = NetworkAvatarSource::new(
        AccountId::new("a"),
        Arc::new(CpuRenderer::new()),
        8,
        4,
    );
    let session = Session::new(
        Arc::new(MemoryAvatarService::new()),
        Arc::new(MemoryRoster::new()),
    );
    source.shutdown_session(&session);
    assert!(!source.is_prepared());
}

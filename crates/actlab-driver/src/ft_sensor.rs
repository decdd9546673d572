//! 辅助力/力矩传感器采集
//!
//! 后台线程通过 UDP 向传感器发送开始实时流请求，之后持续接收 RDT 记录，
//! 打上单调时间戳后经 channel 送出。接收超时让线程能及时观察到停止标志。

use crate::error::{DriverError, TransportError};
use actlab_protocol::{RDT_START_REQUEST, RdtRecord};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{Builder, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 一条带时间戳的传感器记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FtSample {
    /// 相对于采集起点的单调时间（纳秒）
    pub timestamp_ns: u64,
    pub record: RdtRecord,
}

/// 传感器采集线程
pub struct FtSensorPoller {
    is_running: Arc<AtomicBool>,
    rx: Receiver<FtSample>,
    thread: Option<JoinHandle<()>>,
    sensor: SocketAddr,
}

impl FtSensorPoller {
    /// 接收超时（停止标志的最大响应延迟）
    pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

    /// Net F/T 传感器的默认 RDT 端口
    pub const DEFAULT_PORT: u16 = 49152;

    /// 启动采集
    ///
    /// `epoch` 是时间戳零点，通常与执行器样本共用，便于对齐两路数据。
    pub fn start(sensor: SocketAddr, epoch: Instant) -> Result<Self, DriverError> {
        let bind_addr: SocketAddr = if sensor.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(bind_addr).map_err(TransportError::Io)?;
        socket.connect(sensor).map_err(TransportError::Io)?;
        socket
            .set_read_timeout(Some(Self::READ_TIMEOUT))
            .map_err(TransportError::Io)?;
        socket.send(&RDT_START_REQUEST).map_err(TransportError::Io)?;

        let is_running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = unbounded();

        let running = is_running.clone();
        let thread = Builder::new()
            .name("ft-sensor".to_string())
            .spawn(move || poll_loop(socket, tx, running, epoch))
            .map_err(TransportError::Io)?;

        info!("F/T sensor streaming started from {}", sensor);

        Ok(Self {
            is_running,
            rx,
            thread: Some(thread),
            sensor,
        })
    }

    pub fn sensor(&self) -> SocketAddr {
        self.sensor
    }

    pub fn receiver(&self) -> &Receiver<FtSample> {
        &self.rx
    }

    /// 取出目前已收到的全部记录
    pub fn drain(&self) -> Vec<FtSample> {
        self.rx.try_iter().collect()
    }

    /// 停止采集并返回剩余记录
    pub fn stop(mut self) -> Vec<FtSample> {
        self.shutdown();
        self.drain()
    }

    fn shutdown(&mut self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            error!("F/T sensor thread panicked");
        }
    }
}

impl Drop for FtSensorPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop(socket: UdpSocket, tx: Sender<FtSample>, is_running: Arc<AtomicBool>, epoch: Instant) {
    let mut buf = [0u8; 64];
    let mut received: u64 = 0;

    while is_running.load(Ordering::Acquire) {
        match socket.recv(&mut buf) {
            Ok(len) => match RdtRecord::parse(&buf[..len]) {
                Ok(record) => {
                    let timestamp_ns = u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
                    if tx.send(FtSample { timestamp_ns, record }).is_err() {
                        break;
                    }
                    received += 1;
                },
                Err(e) => warn!("Dropping malformed F/T datagram: {}", e),
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {},
            // 传感器尚未就绪时 ICMP 不可达会以此形式出现
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                debug!("F/T sensor unreachable: {}", e);
            },
            Err(e) => {
                error!("F/T sensor receive failed: {}", e);
                break;
            },
        }
    }

    debug!("F/T sensor thread exiting after {} records", received);
}

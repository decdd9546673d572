//! 寄存器目录
//!
//! moteus 控制器的寄存器地址与名称对照表。名称使用厂商文档中的大写形式
//! （如 `Q_CURRENT`），脚本和配置文件通过名称引用寄存器。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

macro_rules! registers {
    ($( $(#[$meta:meta])* $variant:ident = $addr:literal => $name:literal, )*) => {
        /// 控制器寄存器
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, num_enum::TryFromPrimitive,
        )]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(u16)]
        pub enum Register {
            $( $(#[$meta])* $variant = $addr, )*
        }

        impl Register {
            /// 目录中的全部寄存器（按地址排序）
            pub const ALL: &'static [Register] = &[ $( Register::$variant, )* ];

            /// 厂商文档中的大写名称
            pub fn name(self) -> &'static str {
                match self {
                    $( Register::$variant => $name, )*
                }
            }

            /// 按名称查找寄存器（大小写不敏感）
            pub fn from_name(name: &str) -> Result<Self, ProtocolError> {
                let upper = name.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $( $name => Ok(Register::$variant), )*
                    _ => Err(ProtocolError::UnknownRegister(name.to_string())),
                }
            }
        }
    };
}

registers! {
    Mode = 0x000 => "MODE",
    Position = 0x001 => "POSITION",
    Velocity = 0x002 => "VELOCITY",
    Torque = 0x003 => "TORQUE",
    QCurrent = 0x004 => "Q_CURRENT",
    DCurrent = 0x005 => "D_CURRENT",
    AbsPosition = 0x006 => "ABS_POSITION",
    Power = 0x007 => "POWER",
    /// 电机温度（原始值，需要换算）
    MotorTemperature = 0x00a => "MOTOR_TEMPERATURE",
    /// 轨迹完成标志（0/1）
    TrajectoryComplete = 0x00b => "TRAJECTORY_COMPLETE",
    HomeState = 0x00c => "HOME_STATE",
    Voltage = 0x00d => "VOLTAGE",
    /// 控制器板温（°C）
    Temperature = 0x00e => "TEMPERATURE",
    /// 故障码，0 表示无故障
    Fault = 0x00f => "FAULT",

    PwmPhaseA = 0x010 => "PWM_PHASE_A",
    PwmPhaseB = 0x011 => "PWM_PHASE_B",
    PwmPhaseC = 0x012 => "PWM_PHASE_C",
    VoltagePhaseA = 0x014 => "VOLTAGE_PHASE_A",
    VoltagePhaseB = 0x015 => "VOLTAGE_PHASE_B",
    VoltagePhaseC = 0x016 => "VOLTAGE_PHASE_C",
    VfocTheta = 0x018 => "VFOC_THETA",
    VfocVoltage = 0x019 => "VFOC_VOLTAGE",
    VoltageDqD = 0x01a => "VOLTAGEDQ_D",
    VoltageDqQ = 0x01b => "VOLTAGEDQ_Q",
    CommandQCurrent = 0x01c => "COMMAND_Q_CURRENT",
    CommandDCurrent = 0x01d => "COMMAND_D_CURRENT",

    CommandPosition = 0x020 => "COMMAND_POSITION",
    CommandVelocity = 0x021 => "COMMAND_VELOCITY",
    CommandFeedforwardTorque = 0x022 => "COMMAND_FEEDFORWARD_TORQUE",
    CommandKpScale = 0x023 => "COMMAND_KP_SCALE",
    CommandKdScale = 0x024 => "COMMAND_KD_SCALE",
    CommandPositionMaxTorque = 0x025 => "COMMAND_POSITION_MAX_TORQUE",
    CommandStopPosition = 0x026 => "COMMAND_STOP_POSITION",
    CommandTimeout = 0x027 => "COMMAND_TIMEOUT",
    VelocityLimit = 0x028 => "VELOCITY_LIMIT",
    AccelLimit = 0x029 => "ACCEL_LIMIT",
    FixedVoltageOverride = 0x02a => "FIXED_VOLTAGE_OVERRIDE",
    IlimitScale = 0x02b => "ILIMIT_SCALE",
    FixedCurrentOverride = 0x02c => "FIXED_CURRENT_OVERRIDE",
    IgnorePositionBounds = 0x02d => "IGNORE_POSITION_BOUNDS",

    PositionKp = 0x030 => "POSITION_KP",
    PositionKi = 0x031 => "POSITION_KI",
    PositionKd = 0x032 => "POSITION_KD",
    PositionFeedforward = 0x033 => "POSITION_FEEDFORWARD",
    PositionCommand = 0x034 => "POSITION_COMMAND",

    ControlPosition = 0x038 => "CONTROL_POSITION",
    ControlVelocity = 0x039 => "CONTROL_VELOCITY",
    ControlTorque = 0x03a => "CONTROL_TORQUE",
    ControlPositionError = 0x03b => "CONTROL_POSITION_ERROR",
    ControlVelocityError = 0x03c => "CONTROL_VELOCITY_ERROR",
    ControlTorqueError = 0x03d => "CONTROL_TORQUE_ERROR",

    StayWithinLowerBound = 0x040 => "COMMAND_STAY_WITHIN_LOWER_BOUND",
    StayWithinUpperBound = 0x041 => "COMMAND_STAY_WITHIN_UPPER_BOUND",
    StayWithinFeedforwardTorque = 0x042 => "COMMAND_STAY_WITHIN_FEEDFORWARD_TORQUE",
    StayWithinKpScale = 0x043 => "COMMAND_STAY_WITHIN_KP_SCALE",
    StayWithinKdScale = 0x044 => "COMMAND_STAY_WITHIN_KD_SCALE",
    StayWithinMaxTorque = 0x045 => "COMMAND_STAY_WITHIN_MAX_TORQUE",
    StayWithinTimeout = 0x046 => "COMMAND_STAY_WITHIN_TIMEOUT",

    Encoder0Position = 0x050 => "ENCODER_0_POSITION",
    Encoder0Velocity = 0x051 => "ENCODER_0_VELOCITY",
    Encoder1Position = 0x052 => "ENCODER_1_POSITION",
    Encoder1Velocity = 0x053 => "ENCODER_1_VELOCITY",
    Encoder2Position = 0x054 => "ENCODER_2_POSITION",
    Encoder2Velocity = 0x055 => "ENCODER_2_VELOCITY",
    EncoderValidity = 0x058 => "ENCODER_VALIDITY",

    Aux1GpioCommand = 0x05c => "AUX1_GPIO_COMMAND",
    Aux2GpioCommand = 0x05d => "AUX2_GPIO_COMMAND",
    Aux1GpioStatus = 0x05e => "AUX1_GPIO_STATUS",
    Aux2GpioStatus = 0x05f => "AUX2_GPIO_STATUS",

    MillisecondCounter = 0x070 => "MILLISECOND_COUNTER",
    ClockTrim = 0x071 => "CLOCK_TRIM",

    ModelNumber = 0x100 => "MODEL_NUMBER",
    FirmwareVersion = 0x101 => "FIRMWARE_VERSION",
    RegisterMapVersion = 0x102 => "REGISTER_MAP_VERSION",
    MultiplexId = 0x110 => "MULTIPLEX_ID",
    SerialNumber1 = 0x120 => "SERIAL_NUMBER1",
    SerialNumber2 = 0x121 => "SERIAL_NUMBER2",
    SerialNumber3 = 0x122 => "SERIAL_NUMBER3",

    SetOutputNearest = 0x130 => "SET_OUTPUT_NEAREST",
    SetOutputExact = 0x131 => "SET_OUTPUT_EXACT",
    RequireReindex = 0x132 => "REQUIRE_REINDEX",
    RecapturePositionVelocity = 0x133 => "RECAPTURE_POSITION_VELOCITY",

    DriverFault1 = 0x140 => "DRIVER_FAULT1",
    DriverFault2 = 0x141 => "DRIVER_FAULT2",
}

impl Register {
    /// 寄存器地址
    pub fn address(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Register::from_name(s)
    }
}

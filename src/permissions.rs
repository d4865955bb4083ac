//! Android runtime ("dangerous") permissions, grouped the way the system
//! prompts for them.

use std::fmt;
use std::str::FromStr;

/// The `READ_CALENDAR` permission.
pub const READ_CALENDAR: &str = "android.permission.READ_CALENDAR";
/// The `WRITE_CALENDAR` permission.
pub const WRITE_CALENDAR: &str = "android.permission.WRITE_CALENDAR";
/// The `CAMERA` permission.
pub const CAMERA: &str = "android.permission.CAMERA";
/// The `READ_CONTACTS` permission.
pub const READ_CONTACTS: &str = "android.permission.READ_CONTACTS";
/// The `WRITE_CONTACTS` permission.
pub const WRITE_CONTACTS: &str = "android.permission.WRITE_CONTACTS";
/// The `GET_ACCOUNTS` permission.
pub const GET_ACCOUNTS: &str = "android.permission.GET_ACCOUNTS";
/// The `ACCESS_FINE_LOCATION` permission.
pub const ACCESS_FINE_LOCATION: &str = "android.permission.ACCESS_FINE_LOCATION";
/// The `ACCESS_COARSE_LOCATION` permission.
pub const ACCESS_COARSE_LOCATION: &str = "android.permission.ACCESS_COARSE_LOCATION";
/// The `ACCESS_BACKGROUND_LOCATION` permission.
pub const ACCESS_BACKGROUND_LOCATION: &str = "android.permission.ACCESS_BACKGROUND_LOCATION";
/// The `RECORD_AUDIO` permission.
pub const RECORD_AUDIO: &str = "android.permission.RECORD_AUDIO";
/// The `READ_PHONE_STATE` permission.
pub const READ_PHONE_STATE: &str = "android.permission.READ_PHONE_STATE";
/// The `READ_PHONE_NUMBERS` permission.
pub const READ_PHONE_NUMBERS: &str = "android.permission.READ_PHONE_NUMBERS";
/// The `CALL_PHONE` permission.
pub const CALL_PHONE: &str = "android.permission.CALL_PHONE";
/// The `ANSWER_PHONE_CALLS` permission.
pub const ANSWER_PHONE_CALLS: &str = "android.permission.ANSWER_PHONE_CALLS";
/// The `READ_CALL_LOG` permission.
pub const READ_CALL_LOG: &str = "android.permission.READ_CALL_LOG";
/// The `WRITE_CALL_LOG` permission.
pub const WRITE_CALL_LOG: &str = "android.permission.WRITE_CALL_LOG";
/// The `ADD_VOICEMAIL` permission.
pub const ADD_VOICEMAIL: &str = "com.android.voicemail.permission.ADD_VOICEMAIL";
/// The `USE_SIP` permission.
pub const USE_SIP: &str = "android.permission.USE_SIP";
/// The `PROCESS_OUTGOING_CALLS` permission.
pub const PROCESS_OUTGOING_CALLS: &str = "android.permission.PROCESS_OUTGOING_CALLS";
/// The `BODY_SENSORS` permission.
pub const BODY_SENSORS: &str = "android.permission.BODY_SENSORS";
/// The `SEND_SMS` permission.
pub const SEND_SMS: &str = "android.permission.SEND_SMS";
/// The `RECEIVE_SMS` permission.
pub const RECEIVE_SMS: &str = "android.permission.RECEIVE_SMS";
/// The `READ_SMS` permission.
pub const READ_SMS: &str = "android.permission.READ_SMS";
/// The `RECEIVE_WAP_PUSH` permission.
pub const RECEIVE_WAP_PUSH: &str = "android.permission.RECEIVE_WAP_PUSH";
/// The `RECEIVE_MMS` permission.
pub const RECEIVE_MMS: &str = "android.permission.RECEIVE_MMS";
/// The `READ_EXTERNAL_STORAGE` permission.
pub const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";
/// The `WRITE_EXTERNAL_STORAGE` permission.
pub const WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";
/// The `ACTIVITY_RECOGNITION` permission.
pub const ACTIVITY_RECOGNITION: &str = "android.permission.ACTIVITY_RECOGNITION";

// API levels at which permissions were introduced.
const API_O: u32 = 26;
const API_Q: u32 = 29;

/// A group of runtime permissions granted together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionGroup {
    /// `android.permission-group.CALENDAR`
    Calendar,
    /// `android.permission-group.CAMERA`
    Camera,
    /// `android.permission-group.CONTACTS`
    Contacts,
    /// `android.permission-group.LOCATION`
    Location,
    /// `android.permission-group.MICROPHONE`
    Microphone,
    /// `android.permission-group.PHONE`
    Phone,
    /// `android.permission-group.SENSORS`
    Sensors,
    /// `android.permission-group.SMS`
    Sms,
    /// `android.permission-group.STORAGE`
    Storage,
    /// `android.permission-group.ACTIVITY_RECOGNITION`
    ActivityRecognition,
}

impl PermissionGroup {
    /// Every group, in declaration order.
    pub const ALL: [PermissionGroup; 10] = [
        PermissionGroup::Calendar,
        PermissionGroup::Camera,
        PermissionGroup::Contacts,
        PermissionGroup::Location,
        PermissionGroup::Microphone,
        PermissionGroup::Phone,
        PermissionGroup::Sensors,
        PermissionGroup::Sms,
        PermissionGroup::Storage,
        PermissionGroup::ActivityRecognition,
    ];

    /// The upper-case group name, e.g. `"LOCATION"`.
    pub fn name(self) -> &'static str {
        match self {
            PermissionGroup::Calendar => "CALENDAR",
            PermissionGroup::Camera => "CAMERA",
            PermissionGroup::Contacts => "CONTACTS",
            PermissionGroup::Location => "LOCATION",
            PermissionGroup::Microphone => "MICROPHONE",
            PermissionGroup::Phone => "PHONE",
            PermissionGroup::Sensors => "SENSORS",
            PermissionGroup::Sms => "SMS",
            PermissionGroup::Storage => "STORAGE",
            PermissionGroup::ActivityRecognition => "ACTIVITY_RECOGNITION",
        }
    }

    /// Every permission of the group that exists at `api_level`.
    pub fn permissions(self, api_level: u32) -> Vec<&'static str> {
        self.table()
            .iter()
            .filter(|(_, since)| api_level >= *since)
            .map(|(permission, _)| *permission)
            .collect()
    }

    fn table(self) -> &'static [(&'static str, u32)] {
        match self {
            PermissionGroup::Calendar => &[(READ_CALENDAR, 1), (WRITE_CALENDAR, 1)],
            PermissionGroup::Camera => &[(CAMERA, 1)],
            PermissionGroup::Contacts => &[(READ_CONTACTS, 1), (WRITE_CONTACTS, 1), (GET_ACCOUNTS, 1)],
            PermissionGroup::Location => &[
                (ACCESS_FINE_LOCATION, 1),
                (ACCESS_COARSE_LOCATION, 1),
                (ACCESS_BACKGROUND_LOCATION, API_Q),
            ],
            PermissionGroup::Microphone => &[(RECORD_AUDIO, 1)],
            PermissionGroup::Phone => &[
                (READ_PHONE_STATE, 1),
                (READ_PHONE_NUMBERS, API_O),
                (CALL_PHONE, 1),
                (ANSWER_PHONE_CALLS, API_O),
                (READ_CALL_LOG, 1),
                (WRITE_CALL_LOG, 1),
                (ADD_VOICEMAIL, 1),
                (USE_SIP, 1),
                (PROCESS_OUTGOING_CALLS, 1),
            ],
            PermissionGroup::Sensors => &[(BODY_SENSORS, 1)],
            PermissionGroup::Sms => &[
                (SEND_SMS, 1),
                (RECEIVE_SMS, 1),
                (READ_SMS, 1),
                (RECEIVE_WAP_PUSH, 1),
                (RECEIVE_MMS, 1),
            ],
            PermissionGroup::Storage => &[(READ_EXTERNAL_STORAGE, 1), (WRITE_EXTERNAL_STORAGE, 1)],
            PermissionGroup::ActivityRecognition => &[(ACTIVITY_RECOGNITION, API_Q)],
        }
    }
}

impl fmt::Display for PermissionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing a name that is not a permission group.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission group `{0}`")]
pub struct UnknownGroup(pub String);

impl FromStr for PermissionGroup {
    type Err = UnknownGroup;

    /// Accepts the group name in any case, with or without the
    /// `android.permission-group.` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("android.permission-group.").unwrap_or(s);
        PermissionGroup::ALL
            .into_iter()
            .find(|group| group.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownGroup(s.to_owned()))
    }
}

/// The group `permission` belongs to, if it is a runtime permission.
pub fn group_of(permission: &str) -> Option<PermissionGroup> {
    PermissionGroup::ALL
        .into_iter()
        .find(|group| group.table().iter().any(|(p, _)| *p == permission))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_permissions_depend_on_api_level() {
        assert_eq!(
            PermissionGroup::Phone.permissions(25),
            [
                READ_PHONE_STATE,
                CALL_PHONE,
                READ_CALL_LOG,
                WRITE_CALL_LOG,
                ADD_VOICEMAIL,
                USE_SIP,
                PROCESS_OUTGOING_CALLS
            ]
        );
        assert!(PermissionGroup::Phone.permissions(26).contains(&ANSWER_PHONE_CALLS));
        assert!(PermissionGroup::ActivityRecognition.permissions(28).is_empty());
        assert_eq!(PermissionGroup::Location.permissions(29).len(), 3);
    }

    #[test]
    fn parses_group_names() {
        assert_eq!("location".parse(), Ok(PermissionGroup::Location));
        assert_eq!(
            "android.permission-group.SMS".parse(),
            Ok(PermissionGroup::Sms)
        );
        assert_eq!(
            "WIFI".parse::<PermissionGroup>(),
            Err(UnknownGroup("WIFI".to_owned()))
        );
    }

    #[test]
    fn finds_group_of_permission() {
        assert_eq!(group_of(RECORD_AUDIO), Some(PermissionGroup::Microphone));
        assert_eq!(group_of("android.permission.INTERNET"), None);
        for group in PermissionGroup::ALL {
            for permission in group.permissions(u32::MAX) {
                assert_eq!(group_of(permission), Some(group));
            }
        }
    }
}

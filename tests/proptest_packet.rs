use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use proptest::prelude::*;

use dhcpserve::options::{OptionIter, encode_option, parse_options};
use dhcpserve::{
    DhcpMessage, DhcpRequest, Error, MessageType, NetworkRoute, RelayInfo, ReplyConfiguration,
    ReplyOverrides, select_reply_options,
};

const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
const DHCP_FIXED_HEADER_SIZE: usize = 240;

fn valid_header() -> Vec<u8> {
    let mut packet = vec![0u8; DHCP_FIXED_HEADER_SIZE];
    packet[0] = 1;
    packet[1] = 1;
    packet[2] = 6;
    packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
    packet
}

fn reply_config() -> ReplyConfiguration {
    ReplyConfiguration {
        subnet_mask: Some(Ipv4Addr::new(255, 255, 255, 0)),
        server_identifier: Some(Ipv4Addr::new(10, 0, 0, 1)),
        router: Some(Ipv4Addr::new(10, 0, 0, 1)),
        dns_servers: vec![Ipv4Addr::new(10, 0, 0, 53)],
        domain_name: Some("lab.local".to_string()),
        renewal_time: Some(1800),
        rebinding_time: Some(3150),
        static_routes: vec![NetworkRoute {
            network: Ipv4Addr::new(172, 16, 0, 0),
            prefix_length: 12,
            gateway: Ipv4Addr::new(10, 0, 0, 2),
        }],
        other_options: BTreeMap::from([(66, b"tftp".to_vec()), (150, vec![10, 0, 0, 9])]),
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10000))]

    #[test]
    fn decode_never_panics_on_arbitrary_bytes(data: Vec<u8>) {
        let _ = DhcpMessage::decode(&data);
        let _ = DhcpRequest::decode(&data);
    }

    #[test]
    fn decode_never_panics_on_valid_header_with_random_options(
        options_data in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut packet = valid_header();
        packet.extend_from_slice(&options_data);

        let message = DhcpMessage::decode(&packet).unwrap();
        prop_assert_eq!(&message.options, &options_data);

        if let Ok(request) = DhcpRequest::decode(&packet) {
            let _ = request.message_type();
            let _ = request.requested_ip();
            let _ = request.relay_info();
        }
    }

    #[test]
    fn option_scan_never_reads_past_stream(
        option_code in 1u8..255,
        option_length in any::<u8>(),
        option_data in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        let mut stream = vec![option_code, option_length];
        let actual_len = (option_length as usize).min(option_data.len());
        stream.extend_from_slice(&option_data[..actual_len]);

        let result = parse_options(&stream);
        if actual_len == option_length as usize {
            prop_assert_eq!(&result.unwrap()[&option_code], &option_data[..actual_len].to_vec());
        } else {
            prop_assert!(matches!(result, Err(Error::MalformedOptions(_))));
        }
    }

    #[test]
    fn relay_parse_never_panics(data in prop::collection::vec(any::<u8>(), 0..300)) {
        let _ = RelayInfo::parse(&data);
    }

    #[test]
    fn roundtrip_encode_decode_preserves_header(
        leading in any::<[u8; 4]>(),
        xid in any::<[u8; 4]>(),
        secs in any::<[u8; 2]>(),
        flags in any::<[u8; 2]>(),
        addresses in any::<[u8; 16]>(),
        chaddr in any::<[u8; 16]>(),
        sname in prop::collection::vec(any::<u8>(), 64),
        file in prop::collection::vec(any::<u8>(), 128),
        cookie in any::<[u8; 4]>(),
    ) {
        let mut packet = valid_header();
        packet[0..4].copy_from_slice(&leading);
        packet[4..8].copy_from_slice(&xid);
        packet[8..10].copy_from_slice(&secs);
        packet[10..12].copy_from_slice(&flags);
        packet[12..28].copy_from_slice(&addresses);
        packet[28..44].copy_from_slice(&chaddr);
        packet[44..108].copy_from_slice(&sname);
        packet[108..236].copy_from_slice(&file);
        packet[236..240].copy_from_slice(&cookie);
        packet.push(255);

        let parsed = DhcpMessage::decode(&packet).unwrap();
        let reparsed = DhcpMessage::decode(&parsed.encode()).unwrap();

        prop_assert_eq!(parsed.op, leading[0]);
        prop_assert_eq!(parsed.htype, leading[1]);
        prop_assert_eq!(parsed.hlen, leading[2]);
        prop_assert_eq!(parsed.hops, leading[3]);
        prop_assert_eq!(&parsed.sname[..], &sname[..]);
        prop_assert_eq!(&parsed.file[..], &file[..]);

        prop_assert_eq!(parsed.op, reparsed.op);
        prop_assert_eq!(parsed.htype, reparsed.htype);
        prop_assert_eq!(parsed.hlen, reparsed.hlen);
        prop_assert_eq!(parsed.hops, reparsed.hops);
        prop_assert_eq!(parsed.xid, reparsed.xid);
        prop_assert_eq!(parsed.secs, reparsed.secs);
        prop_assert_eq!(parsed.flags, reparsed.flags);
        prop_assert_eq!(parsed.ciaddr, reparsed.ciaddr);
        prop_assert_eq!(parsed.yiaddr, reparsed.yiaddr);
        prop_assert_eq!(parsed.siaddr, reparsed.siaddr);
        prop_assert_eq!(parsed.giaddr, reparsed.giaddr);
        prop_assert_eq!(parsed.chaddr, reparsed.chaddr);
        prop_assert_eq!(&parsed.sname[..], &reparsed.sname[..]);
        prop_assert_eq!(&parsed.file[..], &reparsed.file[..]);
        prop_assert_eq!(parsed.magic_cookie, reparsed.magic_cookie);
        prop_assert_eq!(
            parse_options(&parsed.options).unwrap(),
            parse_options(&reparsed.options).unwrap()
        );
    }

    #[test]
    fn valid_packets_always_encode_to_at_least_300_bytes(
        xid in any::<[u8; 4]>(),
        extra_options in prop::collection::vec(any::<u8>(), 0..200)
    ) {
        let mut packet = valid_header();
        packet[4..8].copy_from_slice(&xid);
        packet.extend_from_slice(&extra_options);

        let parsed = DhcpMessage::decode(&packet).unwrap();
        prop_assert!(parsed.encode().len() >= 300);
    }

    #[test]
    fn short_packets_always_rejected(
        data in prop::collection::vec(any::<u8>(), 0..240)
    ) {
        let length = data.len();
        let result = DhcpMessage::decode(&data);
        let rejected = matches!(
            result,
            Err(Error::TruncatedPacket { length: reported, minimum: 240 }) if reported == length
        );
        prop_assert!(rejected);
    }

    #[test]
    fn reply_options_sorted_and_terminated(
        requested in prop::collection::vec(any::<u8>(), 0..40),
        forced_codes in prop::collection::vec(any::<u8>(), 0..10),
        forced_values in prop::collection::btree_map(
            any::<u8>(),
            prop::collection::vec(any::<u8>(), 0..8),
            0..5
        ),
        message_type in 1u8..=8,
        request_type in 1u8..=8,
        with_config: bool,
    ) {
        let mut packet = valid_header();
        encode_option(&mut packet, 53, &[request_type]);
        encode_option(&mut packet, 55, &requested);
        packet.push(255);
        let request = DhcpRequest::decode(&packet).unwrap();

        let message_type = MessageType::try_from(message_type).unwrap();
        let config = reply_config();
        let overrides = ReplyOverrides {
            other_forced_options: forced_values,
            forced_option_codes: forced_codes,
        };

        let stream = select_reply_options(
            message_type,
            &request,
            with_config.then_some(&config),
            &overrides,
        );

        let entries: Vec<(u8, Vec<u8>)> = OptionIter::new(&stream)
            .map(|entry| entry.map(|(code, value)| (code, value.to_vec())))
            .collect::<Result<_, _>>()
            .unwrap();

        let consumed: usize = entries.iter().map(|(_, value)| 2 + value.len()).sum();
        prop_assert_eq!(consumed + 1, stream.len());
        prop_assert_eq!(stream.last(), Some(&255u8));

        prop_assert_eq!(entries[0].0, 53);
        prop_assert_eq!(&entries[0].1, &vec![message_type as u8]);

        let codes: Vec<u8> = entries[1..].iter().map(|(code, _)| *code).collect();
        prop_assert!(codes.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert!(!codes.contains(&53));

        let informing = message_type == MessageType::Inform || request_type == 8;
        if informing {
            for code in [51u8, 58, 59] {
                prop_assert!(!codes.contains(&code) || overrides.other_forced_options.contains_key(&code));
            }
        }
    }
}
